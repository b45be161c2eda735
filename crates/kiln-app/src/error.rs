//! Error types for Kiln applications.
//!
//! [`AppError`] is the single error type flowing through handlers,
//! middleware, responders and commands. Every variant maps to an HTTP
//! status via [`AppError::status`], which is what
//! [`ErrorMiddleware`](crate::ErrorMiddleware) uses when it turns an error
//! into a response.

use http::{Method, StatusCode};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Standard error type for Kiln applications.
///
/// # Example
///
/// ```
/// use kiln_app::AppError;
/// use http::StatusCode;
///
/// let err = AppError::abort(StatusCode::CONFLICT, "already exists");
/// assert_eq!(err.status(), StatusCode::CONFLICT);
/// assert_eq!(err.to_string(), "already exists");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// A handler aborted with an explicit status.
    #[error("{reason}")]
    Abort {
        /// HTTP status to respond with.
        status: StatusCode,
        /// Human-readable reason.
        reason: String,
    },

    /// No route matched the request path.
    #[error("no route found for {method} {path}")]
    NotFound {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
    },

    /// A service was requested that was never registered.
    #[error("service not registered: {type_name}")]
    ServiceNotRegistered {
        /// The Rust type name of the missing service.
        type_name: &'static str,
    },

    /// The request body or query could not be decoded.
    #[error("content error: {0}")]
    Content(String),

    /// An administrative command could not be parsed or refused to run.
    #[error("command failed: {0}")]
    Command(String),

    /// A migration failed while preparing or reverting.
    #[error("migration `{name}` failed: {reason}")]
    Migration {
        /// Name of the failing migration.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Creates an abort error with an explicit status.
    pub fn abort(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::Abort {
            status,
            reason: reason.into(),
        }
    }

    /// Creates a `400 Bad Request` abort.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::abort(StatusCode::BAD_REQUEST, reason)
    }

    /// Creates a `500 Internal Server Error` abort.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::abort(StatusCode::INTERNAL_SERVER_ERROR, reason)
    }

    /// Creates a content decoding error.
    pub fn content(reason: impl Into<String>) -> Self {
        Self::Content(reason.into())
    }

    /// Creates a command error.
    pub fn command(reason: impl Into<String>) -> Self {
        Self::Command(reason.into())
    }

    /// Creates a migration error.
    pub fn migration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Migration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-service error for `T`.
    pub fn not_registered<T: ?Sized>() -> Self {
        Self::ServiceNotRegistered {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Abort { status, .. } => *status,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Content(_) => StatusCode::BAD_REQUEST,
            Self::ServiceNotRegistered { .. }
            | Self::Command(_)
            | Self::Migration { .. }
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<clap::Error> for AppError {
    fn from(err: clap::Error) -> Self {
        Self::Command(err.to_string().trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::content("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound {
                method: Method::GET,
                path: "/missing".to_string(),
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::command("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_registered_names_type() {
        let err = AppError::not_registered::<String>();
        assert!(err.to_string().contains("String"));
    }

    #[test]
    fn test_migration_display() {
        let err = AppError::migration("CreateUsers", "table exists");
        assert_eq!(
            err.to_string(),
            "migration `CreateUsers` failed: table exists"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = AppError::NotFound {
            method: Method::POST,
            path: "/nope".to_string(),
        };
        assert_eq!(err.to_string(), "no route found for POST /nope");
    }
}
