use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::error::Category;
use thiserror::Error;

use crate::models::ErrorBody;

/// Failures of a scoring call, each mapped to its own HTTP status.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    MalformedPayload { message: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("model unavailable: {cause}")]
    ModelUnavailable { cause: String },

    #[error("model invocation failed: {cause}")]
    Invocation { cause: String },
}

impl ScoringError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScoringError::Validation {
            message: message.into(),
        }
    }

    pub fn invocation(cause: impl Into<String>) -> Self {
        ScoringError::Invocation {
            cause: cause.into(),
        }
    }

    /// Stable identifier written in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Validation { .. } => "validation_error",
            ScoringError::MalformedPayload { .. } => "malformed_payload",
            ScoringError::PayloadTooLarge { .. } => "payload_too_large",
            ScoringError::ModelUnavailable { .. } => "model_unavailable",
            ScoringError::Invocation { .. } => "invocation_error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Classifies a JSON extractor failure. Schema problems (missing field,
    /// wrong type) are validation errors; broken JSON is a malformed payload.
    pub fn from_json_payload(err: &JsonPayloadError) -> Self {
        match err {
            JsonPayloadError::Deserialize(inner) if inner.classify() == Category::Data => {
                ScoringError::validation(inner.to_string())
            }
            JsonPayloadError::OverflowKnownLength { limit, .. }
            | JsonPayloadError::Overflow { limit } => ScoringError::PayloadTooLarge { limit: *limit },
            JsonPayloadError::ContentType => ScoringError::MalformedPayload {
                message: "expected Content-Type: application/json".to_string(),
            },
            other => ScoringError::MalformedPayload {
                message: other.to_string(),
            },
        }
    }
}

impl ResponseError for ScoringError {
    fn status_code(&self) -> StatusCode {
        match self {
            ScoringError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ScoringError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            ScoringError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ScoringError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ScoringError::Invocation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.kind(), &self.to_string()))
    }
}

/// Error handler installed on the `web::JsonConfig` so that extractor
/// rejections carry the same body as every other scoring error.
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let scoring_err = ScoringError::from_json_payload(&err);
    log::warn!("Rejected payload on {}: {}", req.path(), scoring_err);
    let response = scoring_err.error_response();
    actix_web::error::InternalError::from_response(err, response).into()
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreditApplication;

    fn deserialize_error(body: &str) -> JsonPayloadError {
        let err = serde_json::from_str::<CreditApplication>(body).unwrap_err();
        JsonPayloadError::Deserialize(err)
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let err = ScoringError::from_json_payload(&deserialize_error("{}"));
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn broken_json_is_malformed() {
        let err = ScoringError::from_json_payload(&deserialize_error("{\"AMT_CREDIT\": "));
        assert_eq!(err.kind(), "malformed_payload");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn overflow_reports_the_limit() {
        let err = ScoringError::from_json_payload(&JsonPayloadError::Overflow { limit: 16 });
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "request body exceeds 16 bytes");
    }

    #[test]
    fn server_errors_are_distinguishable() {
        let unavailable = ScoringError::ModelUnavailable {
            cause: "no artifact".into(),
        };
        let failed = ScoringError::invocation("shape mismatch");
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!unavailable.is_client_error());
        assert!(!failed.is_client_error());
        assert!(ScoringError::validation("bad").is_client_error());
    }
}
