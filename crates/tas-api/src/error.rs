//! # Application Error
//!
//! Maps [`TasError`] to HTTP responses. Every error body is
//! `{"code": "...", "description": "..."}` with the status fixed per code.
//! Unknown server errors are logged and answered with a generic
//! description. Upstream failures are logged in full and answered with a
//! fixed description per code, so collaborator responses never reach the
//! client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tas_core::{ErrorCategory, TasError};

/// Wire shape of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub description: String,
}

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain error from the engine.
    #[error(transparent)]
    Tas(#[from] TasError),

    /// Request body could not be parsed.
    #[error("malformed request body: {0}")]
    BadRequest(String),

    /// The blocking engine task did not finish.
    #[error("engine task failed: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Tas(err) => (
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.code(),
            ),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN_SERVER_ERROR"),
        }
    }

    fn is_internal(&self) -> bool {
        match self {
            Self::Tas(err) => err.category() == ErrorCategory::Unknown,
            Self::Internal(_) => true,
            Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let description = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "internal server error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(code, error = %self, "upstream failure");
            }
            match &self {
                Self::Tas(err) if err.category() == ErrorCategory::External => upstream_description(err).to_string(),
                Self::Tas(err) => err.to_string(),
                other => other.to_string(),
            }
        };

        let body = ErrorBody {
            code: code.to_string(),
            description,
        };
        (status, Json(body)).into_response()
    }
}

fn upstream_description(err: &TasError) -> &'static str {
    match err {
        TasError::BlockchainGetDidDocumentFailed(_) => "DID document lookup failed",
        TasError::BlockchainRegisterDidDocumentFailed(_) => "DID document registration failed",
        TasError::BlockchainUpdateDidDocumentFailed(_) => "DID document update failed",
        TasError::BlockchainRegisterVcMetaFailed(_) => "credential metadata registration failed",
        TasError::BlockchainGetVcMetaFailed(_) => "credential metadata lookup failed",
        TasError::BlockchainUpdateVcStatusFailed(_) => "credential status update failed",
        TasError::IssuerCommunicationError(_) => "issuer unreachable",
        TasError::IssuerUnknownResponse(_) => "issuer returned an unexpected response",
        TasError::NotificationFailed(_) => "notification delivery failed",
        TasError::StoreUnavailable(_) => "storage unavailable",
        _ => "upstream service failure",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_bad_request() {
        let (status, code) = AppError::from(TasError::InvalidRequest("x".into())).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_REQUEST");
    }

    #[test]
    fn state_errors_keep_their_status() {
        let (status, code) = AppError::from(TasError::VcAlreadyRevoked("urn:uuid:1".into())).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "VC_ALREADY_REVOKED");
    }

    #[test]
    fn unknown_errors_are_hidden() {
        let resp = AppError::from(TasError::Unknown("key file /etc/tas missing".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn upstream_body_stays_in_the_log() {
        let err = TasError::IssuerUnknownResponse("HTTP 502: <html>nginx/1.25 db=10.0.3.7</html>".into());
        let resp = AppError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "ISSUER_UNKNOWN_RESPONSE");
        assert_eq!(body.description, "issuer returned an unexpected response");
        assert!(!body.description.contains("10.0.3.7"));
    }

    #[test]
    fn join_failures_are_internal() {
        let err = AppError::Internal("panicked".into());
        assert!(err.is_internal());
        assert_eq!(err.status_and_code().1, "UNKNOWN_SERVER_ERROR");
    }
}
