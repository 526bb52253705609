use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Missing selection, non-positive quantity/rate, missing audit fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// No applicable rate, rule or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate code or voucher number on create
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Mutation attempted on a posted voucher
    #[error("Voucher is posted: {0}")]
    Locked(String),

    /// Debit/credit identity failed. Indicates an engine bug, never user input.
    #[error("Computation invariant violated: {0}")]
    InvariantViolation(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = match self {
            AppError::InvariantViolation(detail) => {
                tracing::error!(detail = %detail, "Ledger invariant violation");
                "Internal error".to_string()
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database failure");
                "Internal error".to_string()
            }
            _ if self.is_recoverable() => {
                tracing::debug!(error = %self, "Request rejected");
                self.to_string()
            }
            _ => {
                tracing::warn!(error = %self, "Request failed");
                self.to_string()
            }
        };

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Validation error naming the field the user still has to fill in
    pub fn missing_field(field: &str) -> Self {
        AppError::Validation(format!("{} is required", field))
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn locked(msg: impl Into<String>) -> Self {
        AppError::Locked(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        AppError::InvariantViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Recoverable errors are reported back to the user without changing state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::Locked(_)
        )
    }
}
