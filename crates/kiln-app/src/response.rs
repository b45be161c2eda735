//! Responses and conversion into them.
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | [`Json<T>`] | 200 | `application/json` |
//! | `String`, `&'static str` | 200 | `text/plain; charset=utf-8` |
//! | `StatusCode` | given | none, empty body |
//! | `(StatusCode, R)` | given | that of `R` |
//! | [`Response`] | as built | as built |

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// The response type produced by handlers and responders.
pub type Response = http::Response<Full<Bytes>>;

/// Conversion of handler return values into a [`Response`].
pub trait IntoResponse {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn into_response(self) -> AppResult<Response>;
}

/// A JSON response body.
///
/// # Example
///
/// ```
/// use kiln_app::{IntoResponse, Json};
/// use serde_json::json;
///
/// let response = Json(json!({"value": "Hello, world!"})).into_response().unwrap();
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> AppResult<Response> {
        let body = serde_json::to_vec(&self.0)
            .map_err(|e| AppError::internal(format!("failed to serialize response: {e}")))?;
        Ok(with_body(
            StatusCode::OK,
            Some(HeaderValue::from_static("application/json")),
            Bytes::from(body),
        ))
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> AppResult<Response> {
        Ok(self)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> AppResult<Response> {
        Ok(with_body(self, None, Bytes::new()))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> AppResult<Response> {
        Ok(text(Bytes::from(self)))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> AppResult<Response> {
        Ok(text(Bytes::from_static(self.as_bytes())))
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> AppResult<Response> {
        let mut response = self.1.into_response()?;
        *response.status_mut() = self.0;
        Ok(response)
    }
}

fn text(body: Bytes) -> Response {
    with_body(
        StatusCode::OK,
        Some(HeaderValue::from_static("text/plain; charset=utf-8")),
        body,
    )
}

fn with_body(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}
