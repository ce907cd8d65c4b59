//! Error types for Knapsack.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input violates a stated constraint.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport, auth or timeout failure talking to the reasoning oracle.
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The oracle replied, but the reply is not structured data at all.
    #[error("Oracle returned a malformed response: {0}")]
    OracleMalformedResponse(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable marker for this error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::OracleUnavailable(_) => "oracle_unavailable",
            Error::OracleMalformedResponse(_) => "oracle_malformed_response",
            Error::Timeout(_) => "timeout",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the caller, rather than the service or the oracle, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_markers() {
        assert_eq!(Error::InvalidRequest("x".into()).kind(), "invalid_request");
        assert_eq!(Error::OracleUnavailable("x".into()).kind(), "oracle_unavailable");
        assert_eq!(
            Error::OracleMalformedResponse("x".into()).kind(),
            "oracle_malformed_response"
        );
        assert_eq!(Error::Timeout("x".into()).kind(), "timeout");
    }

    #[test]
    fn test_only_invalid_request_is_client_error() {
        assert!(Error::InvalidRequest("empty pool".into()).is_client_error());
        assert!(!Error::OracleUnavailable("down".into()).is_client_error());
        assert!(!Error::Internal("bug".into()).is_client_error());
    }
}
