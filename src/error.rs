//! # Error Handling
//!
//! This module defines the gateway's error type and how every failure is
//! turned into an HTTP response.
//!
//! ## Response Contract:
//! Whatever goes wrong, the client receives the same JSON shape the analysis
//! endpoint uses for its own failures:
//!
//! ```json
//! {
//!   "status": "error",
//!   "message": "No audio recording was provided.",
//!   "code": "missing_audio"
//! }
//! ```
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of error
//! - **Data**: Variants can carry extra information (a message, a limit, a code)
//! - **Pattern matching**: `match` maps each variant to a status code
//!
//! ### Traits for Error Conversion
//! - **From trait**: Lets `?` convert library errors into `AppError`
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted in logs
//!
//! ## Internal detail stays internal
//! Server-side failures (`AnalysisFailure`, `Internal`, `ConfigError`) answer
//! with a fixed message. Their detail only reaches the logs.

use crate::report::AnalysisResponse;
use crate::submission::{ReferenceError, MIN_REFERENCE_CHARS};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Message returned for every server-side failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "The recitation could not be analyzed. Please try again later.";

/// Closed set of reasons an accepted submission failed on the server.
///
/// These are the only server-side causes a client ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// The upload could not be written to temporary storage.
    StorageUnavailable,
    /// The analyzer returned an error.
    AnalysisFailed,
    /// The analyzer did not answer within the configured timeout.
    AnalysisTimedOut,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::StorageUnavailable => "storage_unavailable",
            FailureCode::AnalysisFailed => "analysis_failed",
            FailureCode::AnalysisTimedOut => "analysis_timeout",
        }
    }
}

/// Custom error types for the gateway.
///
/// ## Error Categories:
/// - **InvalidReference / MissingAudio**: the submission broke the input
///   contract (400)
/// - **BadRequest / ValidationError**: malformed request or config update (400)
/// - **PayloadTooLarge**: body over the configured limit (413)
/// - **NotFound**: unknown route (404)
/// - **AnalysisFailure / Internal / ConfigError**: server-side problems (500)
///
/// ## Usage Example:
/// ```
/// use tajweed_gateway::error::AppError;
///
/// let err = AppError::BadRequest("Invalid multipart body".to_string());
/// assert_eq!(err.code(), "bad_request");
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Reference text missing or shorter than the minimum
    InvalidReference(ReferenceError),

    /// No `audio_file` attachment (or an empty one)
    MissingAudio,

    /// Client sent a body that could not be read as a form
    BadRequest(String),

    /// Request body exceeded `upload.max_body_bytes`
    PayloadTooLarge { limit: usize },

    /// Requested route does not exist
    NotFound(String),

    /// Storage or analysis failed after the submission was accepted.
    /// `detail` is for the logs only.
    AnalysisFailure { code: FailureCode, detail: String },

    /// Unexpected server-side failure
    Internal(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// A runtime configuration update failed validation
    ValidationError(String),
}

impl AppError {
    pub fn analysis(code: FailureCode, detail: impl fmt::Display) -> Self {
        AppError::AnalysisFailure {
            code,
            detail: detail.to_string(),
        }
    }

    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidReference(_) => "invalid_reference",
            AppError::MissingAudio => "missing_audio",
            AppError::BadRequest(_) => "bad_request",
            AppError::PayloadTooLarge { .. } => "payload_too_large",
            AppError::NotFound(_) => "not_found",
            AppError::AnalysisFailure { code, .. } => code.as_str(),
            AppError::Internal(_) => "internal_error",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
        }
    }

    /// Message shown to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidReference(_) => format!(
                "The reference ayah is missing or incomplete (at least {} characters required).",
                MIN_REFERENCE_CHARS
            ),
            AppError::MissingAudio => "No audio recording was provided.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::PayloadTooLarge { limit } => format!(
                "The upload exceeds the maximum allowed size of {} bytes.",
                limit
            ),
            AppError::NotFound(path) => format!("No route for {}", path),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::AnalysisFailure { .. } | AppError::Internal(_) | AppError::ConfigError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidReference(err) => write!(f, "Invalid reference: {}", err),
            AppError::MissingAudio => write!(f, "Missing audio attachment"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::PayloadTooLarge { limit } => write!(f, "Payload larger than {} bytes", limit),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::AnalysisFailure { code, detail } => {
                write!(f, "Analysis failure ({}): {}", code.as_str(), detail)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

/// Converts `AppError` into the uniform JSON error response.
///
/// ## HTTP Status Code Mapping:
/// - InvalidReference/MissingAudio/BadRequest/ValidationError → 400
/// - NotFound → 404
/// - PayloadTooLarge → 413
/// - AnalysisFailure/Internal/ConfigError → 500
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidReference(_)
            | AppError::MissingAudio
            | AppError::BadRequest(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::AnalysisFailure { .. } | AppError::Internal(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(AnalysisResponse::error(self.public_message(), Some(self.code())))
    }
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        AppError::InvalidReference(err)
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// When you use `?` with an anyhow::Error, it becomes an `AppError::Internal`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are the client's fault, so they map to 400.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_missing_audio_response() {
        let (status, body) = body_json(AppError::MissingAudio).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "missing_audio");
        assert!(body["message"].as_str().unwrap().contains("audio"));
        assert!(body.get("report").is_none());
    }

    #[actix_web::test]
    async fn test_invalid_reference_response() {
        let (status, body) =
            body_json(AppError::InvalidReference(ReferenceError::TooShort { chars: 3 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_reference");
        assert!(body["message"].as_str().unwrap().contains("reference ayah"));
    }

    #[actix_web::test]
    async fn test_analysis_failure_hides_detail() {
        let err = AppError::analysis(FailureCode::AnalysisFailed, "connection refused at 10.0.0.7:443");
        assert!(err.to_string().contains("10.0.0.7"));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "analysis_failed");
        assert_eq!(body["message"], GENERIC_FAILURE_MESSAGE);
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    #[actix_web::test]
    async fn test_payload_too_large_response() {
        let (status, body) = body_json(AppError::PayloadTooLarge { limit: 1024 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "payload_too_large");
        assert!(body["message"].as_str().unwrap().contains("1024"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
    }
}
