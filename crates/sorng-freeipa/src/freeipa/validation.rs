//! Field validators for desired-state descriptions.
//!
//! Each validator takes the field name and the value and fails with
//! [`IpaError::InvalidArgument`] naming the field.

use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::types::MemberKind;
use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,4}$")
        .expect("valid e-mail regex");
    static ref SCOPE_RE: Regex =
        Regex::new(r"^[\w\d.-]+([\s]?[\w\d.-]+)*$").expect("valid scope regex");
}

/// Signature shared by every validator, so they can be chained.
pub type Validator = fn(&str, &str) -> IpaResult<()>;

fn invalid(field: &str, message: &str) -> IpaError {
    IpaError::InvalidArgument(format!("expected \"{}\" {}", field, message))
}

/// Run `validators` in order, stopping at the first failure.
pub fn all(field: &str, value: &str, validators: &[Validator]) -> IpaResult<()> {
    validators.iter().try_for_each(|v| v(field, value))
}

pub fn not_whitespace(field: &str, value: &str) -> IpaResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "to not be an empty string or whitespace"));
    }
    Ok(())
}

/// Rejects values made of digits only; the empty string passes.
pub fn not_only_digits(field: &str, value: &str) -> IpaResult<()> {
    if !value.is_empty() && value.chars().all(char::is_numeric) {
        return Err(invalid(field, "to not only contain digits"));
    }
    Ok(())
}

pub fn no_upper_letter(field: &str, value: &str) -> IpaResult<()> {
    if value.chars().any(char::is_uppercase) {
        return Err(invalid(field, "to not contain any upper letter"));
    }
    Ok(())
}

/// Login names and group names.
pub fn identifier(field: &str, value: &str) -> IpaResult<()> {
    all(field, value, &[not_whitespace, no_upper_letter, not_only_digits])
}

pub fn http_url(field: &str, value: &str) -> IpaResult<()> {
    let url = url::Url::parse(value).map_err(|e| invalid(field, &format!("to be a valid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err(invalid(field, "to have a host")),
        other => Err(invalid(
            field,
            &format!("to have a http or https scheme, got {}", other),
        )),
    }
}

pub fn rfc3339(field: &str, value: &str) -> IpaResult<()> {
    DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|e| invalid(field, &format!("to be a valid RFC 3339 date: {}", e)))
}

pub fn email(field: &str, value: &str) -> IpaResult<()> {
    if !EMAIL_RE.is_match(value) {
        return Err(invalid(field, "to be a valid email address"));
    }
    Ok(())
}

/// Space separated list of word characters, dots and dashes.
pub fn scope(field: &str, value: &str) -> IpaResult<()> {
    if !SCOPE_RE.is_match(value) {
        return Err(invalid(field, "to be a space separated list of scopes"));
    }
    Ok(())
}

/// `service/host_fqdn`
pub fn service_name(field: &str, value: &str) -> IpaResult<()> {
    if !value.contains('/') {
        return Err(invalid(field, "to be in the form of service/host_fqdn"));
    }
    Ok(())
}

pub fn member_type(field: &str, value: &str) -> IpaResult<()> {
    value
        .parse::<MemberKind>()
        .map(|_| ())
        .map_err(|_| invalid(field, "to be one of user, group or service"))
}
