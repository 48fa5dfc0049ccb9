use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for planwatch.
#[derive(Debug, thiserror::Error)]
pub enum PlanwatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification dispatch failed: {0}")]
    NotificationDispatch(String),

    #[error("Shared configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PlanwatchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::NotificationDispatch(msg.into())
    }

    pub fn config_unavailable(msg: impl Into<String>) -> Self {
        Self::ConfigUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ConfigUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_)
            | Self::NotificationDispatch(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a message safe to expose to API clients.
    ///
    /// Client errors (4xx) carry their detail; server errors show a generic
    /// message and the detail stays in the server logs.
    fn safe_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Validation failed: {}", msg),
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::ConfigUnavailable(_) => "Service unavailable".to_string(),
            Self::Storage(_)
            | Self::NotificationDispatch(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => "Internal server error".to_string(),
        }
    }
}

/// Standard JSON body for error responses.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl IntoResponse for PlanwatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full detail goes to the server logs, not to the client.
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias for planwatch.
pub type Result<T> = std::result::Result<T, PlanwatchError>;

impl From<reqwest::Error> for PlanwatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlanwatchError::NotificationDispatch(format!("request timed out: {}", err))
        } else if err.is_connect() {
            PlanwatchError::NotificationDispatch(format!("connection failed: {}", err))
        } else {
            PlanwatchError::NotificationDispatch(format!("request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for PlanwatchError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            PlanwatchError::Validation(format!("JSON error: {}", err))
        } else {
            PlanwatchError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}
