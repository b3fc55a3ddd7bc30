//! Tagged scalar wire encodings.
//!
//! The IPA RPC layer ships values JSON cannot express natively as
//! single-key objects with a reserved key:
//!
//! - `{"__datetime__": "20230101000000Z"}`: generalized time, UTC
//! - `{"__base64__": "c2VjcmV0"}`: binary / secret payloads
//!
//! [`IpaTime`] and [`Base64Secret`] are the inner values; [`TaggedDateTime`]
//! and [`TaggedSecret`] are the wrapper objects as they appear on the wire.

use crate::freeipa::error::{IpaError, IpaResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// `chrono` rendering of the wire layout `YYYYMMDDHHMMSSZ`.
pub const IPA_TIME_LAYOUT: &str = "%Y%m%d%H%M%SZ";

const IPA_TIME_LEN: usize = 15;

// ── Timestamps ──────────────────────────────────────────────────────

/// A generalized-time value. The zero value (`None`) stands for "no value"
/// and encodes to JSON `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpaTime(Option<DateTime<Utc>>);

impl IpaTime {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    /// Parse the wire layout. Surrounding quotes are stripped and the
    /// literal `null` yields the zero value.
    pub fn parse(raw: &str) -> IpaResult<Self> {
        let s = raw.trim_matches('"');
        if s == "null" {
            return Ok(Self::default());
        }

        let bytes = s.as_bytes();
        if bytes.len() != IPA_TIME_LEN
            || bytes[IPA_TIME_LEN - 1] != b'Z'
            || !bytes[..IPA_TIME_LEN - 1].iter().all(u8::is_ascii_digit)
        {
            return Err(IpaError::Format(format!(
                "'{}' does not match layout YYYYMMDDHHMMSSZ",
                s
            )));
        }

        // All positions are ASCII digits at this point.
        let field = |from: usize, to: usize| -> u32 {
            s[from..to].bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
        };

        let naive = NaiveDate::from_ymd_opt(field(0, 4) as i32, field(4, 6), field(6, 8))
            .and_then(|d| d.and_hms_opt(field(8, 10), field(10, 12), field(12, 14)))
            .ok_or_else(|| IpaError::Format(format!("'{}' is not a valid date/time", s)))?;

        Ok(Self(Some(Utc.from_utc_datetime(&naive))))
    }

    /// Parse the RFC 3339 form used in desired-state descriptions. An empty
    /// string yields the zero value.
    pub fn from_rfc3339(s: &str) -> IpaResult<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(Some(dt.with_timezone(&Utc))))
            .map_err(|e| IpaError::Format(format!("'{}' is not an RFC 3339 time: {}", s, e)))
    }

    /// Wire layout, or `None` for the zero value.
    pub fn encode(&self) -> Option<String> {
        self.0.map(|dt| dt.format(IPA_TIME_LAYOUT).to_string())
    }

    /// RFC 3339 form, empty for the zero value.
    pub fn to_rfc3339(&self) -> String {
        self.0
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

impl fmt::Display for IpaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for IpaTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.encode() {
            Some(s) => serializer.serialize_str(&s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for IpaTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Self::default()),
            Some(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// `{"__datetime__": ...}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDateTime {
    #[serde(rename = "__datetime__")]
    pub datetime: IpaTime,
}

impl From<IpaTime> for TaggedDateTime {
    fn from(datetime: IpaTime) -> Self {
        Self { datetime }
    }
}

// ── Secrets ─────────────────────────────────────────────────────────

/// A base64 payload kept in its encoded form until explicitly decoded.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Base64Secret(String);

impl Base64Secret {
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn from_plaintext(plain: &str) -> Self {
        Self(BASE64.encode(plain.as_bytes()))
    }

    pub fn encoded(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plaintext of the payload; empty when the payload is not valid base64
    /// or not UTF-8.
    pub fn decode(&self) -> String {
        BASE64
            .decode(self.0.as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Base64Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Base64Secret([REDACTED])")
    }
}

impl Serialize for Base64Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Base64Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
    }
}

/// `{"__base64__": ...}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSecret {
    #[serde(rename = "__base64__", default)]
    pub secret: Base64Secret,
}

impl TaggedSecret {
    pub fn decode(&self) -> String {
        self.secret.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wire_time() {
        let t = IpaTime::parse("20230101000000Z").unwrap();
        let expected = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(t.datetime(), Some(expected));
    }

    #[test]
    fn test_parse_strips_quotes() {
        let t = IpaTime::parse("\"20240229235959Z\"").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-02-29T23:59:59Z");
    }

    #[test]
    fn test_parse_null_is_zero() {
        let t = IpaTime::parse("null").unwrap();
        assert!(t.is_zero());
    }

    #[test]
    fn test_parse_rejects_deviations() {
        for bad in [
            "2023-01-01T00:00:00Z",
            "20230101000000",
            "2023010100000Z",
            "202301010000000Z",
            "20231301000000Z",
            "20230101250000Z",
            "2023010100000aZ",
            "",
        ] {
            let err = IpaTime::parse(bad).unwrap_err();
            assert!(matches!(err, IpaError::Format(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_deserialize_null_and_string() {
        let zero: IpaTime = serde_json::from_value(json!(null)).unwrap();
        assert!(zero.is_zero());

        let t: IpaTime = serde_json::from_value(json!("20230615120000Z")).unwrap();
        assert_eq!(t.encode().as_deref(), Some("20230615120000Z"));
    }

    #[test]
    fn test_deserialize_malformed_fails() {
        assert!(serde_json::from_value::<IpaTime>(json!("yesterday")).is_err());
    }

    #[test]
    fn test_zero_encodes_to_null() {
        assert_eq!(serde_json::to_value(IpaTime::default()).unwrap(), json!(null));
    }

    #[test]
    fn test_tagged_datetime_wire_shape() {
        let tagged: TaggedDateTime =
            serde_json::from_value(json!({"__datetime__": "20230101000000Z"})).unwrap();
        assert_eq!(tagged.datetime.to_rfc3339(), "2023-01-01T00:00:00Z");
        assert_eq!(
            serde_json::to_value(tagged).unwrap(),
            json!({"__datetime__": "20230101000000Z"})
        );
    }

    #[test]
    fn test_rfc3339_conversion() {
        let t = IpaTime::from_rfc3339("2030-05-01T10:00:00+02:00").unwrap();
        assert_eq!(t.encode().as_deref(), Some("20300501080000Z"));
        assert!(IpaTime::from_rfc3339("").unwrap().is_zero());
        assert!(matches!(
            IpaTime::from_rfc3339("tomorrow"),
            Err(IpaError::Format(_))
        ));
    }

    #[test]
    fn test_display_is_rfc3339() {
        let t = IpaTime::parse("20230101000000Z").unwrap();
        assert_eq!(t.to_string(), "2023-01-01T00:00:00Z");
        assert_eq!(IpaTime::default().to_string(), "");
    }

    #[test]
    fn test_secret_decode() {
        let tagged: TaggedSecret =
            serde_json::from_value(json!({"__base64__": "c2VjcmV0"})).unwrap();
        assert_eq!(tagged.decode(), "secret");
    }

    #[test]
    fn test_secret_malformed_is_empty() {
        let tagged: TaggedSecret =
            serde_json::from_value(json!({"__base64__": "%%%not-base64"})).unwrap();
        assert_eq!(tagged.decode(), "");
    }

    #[test]
    fn test_secret_missing_payload_is_empty() {
        let tagged: TaggedSecret = serde_json::from_value(json!({})).unwrap();
        assert!(tagged.secret.is_empty());
        assert_eq!(tagged.decode(), "");
    }

    #[test]
    fn test_secret_passes_through_on_encode() {
        let tagged = TaggedSecret {
            secret: Base64Secret::from_plaintext("hunter2"),
        };
        assert_eq!(
            serde_json::to_value(&tagged).unwrap(),
            json!({"__base64__": "aHVudGVyMg=="})
        );
    }

    #[test]
    fn test_secret_debug_redacted() {
        let s = Base64Secret::from_plaintext("hunter2");
        assert!(!format!("{:?}", s).contains("aHVudGVyMg"));
    }
}
