use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use aws_smithy_types::error::operation::BuildError as SmithyBuildError;
use thiserror::Error;

pub const MEME_NOT_FOUND: &str = "Meme not found";
pub const USER_NOT_FOUND: &str = "User not found";
pub const INVALID_MEME_ID: &str = "Invalid meme id";
pub const INVALID_USER_ID: &str = "Invalid user id";
pub const INVALID_FOREIGN_KEY: &str = "Invalid userId (foreign key)";

// --- Storage Backend Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Record not found")]
    NotFound,

    #[error("Foreign key constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer
}

// --- Service Errors ---

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("Unhandled storage failure")]
    Unhandled(#[source] RepoError),
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Malformed JSON")]
    MalformedJson,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Not found")]
    RouteNotFound,

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// --- Conversions ---

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<SmithyBuildError> for AppError {
    fn from(err: SmithyBuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::Service(ServiceError::Unhandled(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::InvalidArgument(_))
            | AppError::Service(ServiceError::ConstraintViolation(_))
            | AppError::MalformedJson => StatusCode::BAD_REQUEST,
            AppError::Service(ServiceError::NotFound(_)) | AppError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = if status.is_server_error() {
            // Never leak internals to the client
            tracing::error!(error.detail = ?self, "Unhandled failure while serving request");
            "Server error".to_string()
        } else {
            tracing::debug!(error.message = %self, error.status = %status, "Responding with error");
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

/// Body returned for panics caught by the `CatchPanicLayer`.
pub fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked while serving request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Server error" })),
    )
        .into_response()
}
