//! Harness error types.

use std::time::Duration;

use kiln_app::AppError;
use thiserror::Error;

/// Result type alias using [`HarnessError`].
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors raised while building, dispatching or inspecting a test request.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The request path could not be parsed into a URI.
    #[error("invalid request path `{path}`: {reason}")]
    PathParse {
        /// The path as given.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header name or value was invalid.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader {
        /// The header name as given.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A body or query value could not be encoded.
    #[error("failed to encode content as {media_type}: {reason}")]
    Encode {
        /// Target media type.
        media_type: String,
        /// What went wrong.
        reason: String,
    },

    /// A response body could not be decoded into the requested type.
    #[error("failed to decode {media_type} content: {reason}")]
    Decode {
        /// Media type the body was decoded as.
        media_type: String,
        /// What went wrong.
        reason: String,
    },

    /// The application cannot respond to requests.
    #[error("application is not configured to respond: {0}")]
    Configuration(String),

    /// The application's responder failed or panicked.
    #[error("application error: {0}")]
    UnderlyingApplication(#[source] AppError),

    /// The dispatch did not settle within the configured timeout.
    #[error("dispatch timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The runtime driving dispatches is unavailable.
    #[error("harness runtime unavailable: {0}")]
    Runtime(String),
}

impl HarnessError {
    pub(crate) fn encode(media_type: impl ToString, reason: impl ToString) -> Self {
        Self::Encode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(media_type: impl ToString, reason: impl ToString) -> Self {
        Self::Decode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by [`Testable::revert`](crate::Testable::revert).
///
/// The variant names the step that failed; the migrate step never runs
/// after a failed revert step.
#[derive(Error, Debug)]
pub enum RevertError {
    /// `revert --all -y` failed.
    #[error("reverting migrations failed: {0}")]
    Revert(#[source] AppError),

    /// `migrate -y` failed.
    #[error("re-applying migrations failed: {0}")]
    Migrate(#[source] AppError),

    /// The commands could not be driven to completion.
    #[error(transparent)]
    Harness(#[from] HarnessError),
}
