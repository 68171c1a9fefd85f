use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

pub const RULE_NOT_FOUND: &str = "Fraud rule not found";
pub const ALERT_NOT_FOUND: &str = "Fraud alert not found";

/// Error taxonomy for the service. Every variant maps to exactly one HTTP
/// status at the axum boundary; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            // 500 carries the underlying message in a separate field; the
            // client never sees a stack trace.
            ServiceError::Internal(err) => serde_json::json!({
                "message": "Internal server error",
                "error": err.to_string(),
            }),
            other => serde_json::json!({ "message": other.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ServiceError::Validation("Missing required fields".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound(RULE_NOT_FOUND).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("Fraud alert already resolved".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn messages_are_verbatim() {
        let err = ServiceError::NotFound(ALERT_NOT_FOUND);
        assert_eq!(err.to_string(), "Fraud alert not found");
    }
}
