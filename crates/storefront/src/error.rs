//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-class errors
//! to Sentry before responding. All route handlers return
//! `Result<T, AppError>`; responses are JSON with client-safe messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::services::drive::DriveError;
use crate::services::identity::IdentityError;
use crate::services::xendit::XenditError;

/// Destination served to blocked users instead of the default landing page.
pub const BLOCKED_REDIRECT: &str = "/blocked";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog backend operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Invoicing provider operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] XenditError),

    /// Identity provider operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// File-storage provider operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DriveError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The user is blocked; the session has been torn down.
    #[error("Account blocked")]
    Blocked,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Catalog(_)
                | Self::Payment(_)
                | Self::Storage(_)
                | Self::Session(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Catalog(_) | Self::Payment(_) | Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Identity(err) => match err {
                IdentityError::InvalidSession => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Blocked => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose upstream error details to clients
        let message = match &self {
            Self::Catalog(_) | Self::Payment(_) | Self::Storage(_) => {
                "External service error".to_string()
            }
            Self::Identity(err) => match err {
                IdentityError::InvalidSession => "Invalid session".to_string(),
                _ => "External service error".to_string(),
            },
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = match &self {
            // Deliberate override: blocked users are sent to the blocked
            // page, never the default landing page
            Self::Blocked => serde_json::json!({
                "error": message,
                "redirect": BLOCKED_REDIRECT,
            }),
            _ => serde_json::json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
