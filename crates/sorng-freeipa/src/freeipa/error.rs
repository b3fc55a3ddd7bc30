//! FreeIPA error types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote error code the directory server uses for "no such entry".
pub const NOT_FOUND_CODE: i64 = 4001;

/// Business error signalled by the server in the `error` member of the
/// response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND_CODE
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.code, self.message)
    }
}

/// Unified error type for all FreeIPA operations.
#[derive(Debug, thiserror::Error)]
pub enum IpaError {
    /// Missing server URL or credentials; raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Login rejected or unreachable; no session was created.
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Network / HTTP layer failure on an RPC call.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Response body did not match the expected envelope.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Error object returned by the server.
    #[error("{0}")]
    Remote(RemoteError),
    /// Malformed tagged scalar payload.
    #[error("Format error: {0}")]
    Format(String),
    /// Caller-supplied combination rejected before any network call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Member mutation completed nothing and reported per-member failures.
    #[error("Membership change on '{group}' rejected: {reasons}")]
    MembershipRejected { group: String, reasons: String },
    /// No session registered under this id.
    #[error("Session '{0}' not found")]
    SessionNotFound(String),
}

impl IpaError {
    /// Whether this is the server's "no such entry" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IpaError::Remote(e) if e.is_not_found())
    }

    /// Remote error code, if the server signalled one.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            IpaError::Remote(e) => Some(e.code),
            _ => None,
        }
    }
}

impl From<RemoteError> for IpaError {
    fn from(e: RemoteError) -> Self {
        IpaError::Remote(e)
    }
}

impl From<reqwest::Error> for IpaError {
    fn from(e: reqwest::Error) -> Self {
        IpaError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for IpaError {
    fn from(e: serde_json::Error) -> Self {
        IpaError::Decode(e.to_string())
    }
}

impl From<url::ParseError> for IpaError {
    fn from(e: url::ParseError) -> Self {
        IpaError::Config(format!("Invalid server URL: {}", e))
    }
}

/// Convenience Result alias.
pub type IpaResult<T> = Result<T, IpaError>;

/// Convert IpaError to a String for Tauri command returns.
impl From<IpaError> for String {
    fn from(e: IpaError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(code: i64) -> IpaError {
        IpaError::Remote(RemoteError {
            code,
            name: "NotFound".into(),
            message: "alice: user not found".into(),
        })
    }

    #[test]
    fn test_not_found_detection() {
        assert!(remote(4001).is_not_found());
        assert!(!remote(4002).is_not_found());
        assert!(!IpaError::Transport("boom".into()).is_not_found());
    }

    #[test]
    fn test_remote_code() {
        assert_eq!(remote(4002).remote_code(), Some(4002));
        assert_eq!(IpaError::Decode("x".into()).remote_code(), None);
    }

    #[test]
    fn test_remote_display() {
        assert_eq!(
            remote(4001).to_string(),
            "NotFound (4001): alice: user not found"
        );
    }

    #[test]
    fn test_into_string() {
        let s: String = IpaError::InvalidArgument("bad".into()).into();
        assert_eq!(s, "Invalid argument: bad");
    }
}
