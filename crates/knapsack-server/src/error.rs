//! Error → HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use knapsack_core::Error;
use tracing::error;

/// Handler error carrying a core [`Error`].
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidRequest(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match &self.0 {
            Error::OracleUnavailable(_) | Error::OracleMalformedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        (
            status,
            Json(serde_json::json!({
                "error": self.0.kind(),
                "detail": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: Error| ApiError(e).status();
        assert_eq!(status(Error::InvalidRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::OracleUnavailable("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(Error::OracleMalformedResponse("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(Error::Timeout("x".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status(Error::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
