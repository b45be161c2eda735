//! Dispatched responses and typed extraction.

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use kiln_app::{MediaType, Response};
use serde::de::DeserializeOwned;

use crate::codec::ContentCodec;
use crate::error::{HarnessError, HarnessResult};

/// A fully buffered response.
///
/// Status and headers are plain accessors; typed extraction goes through
/// [`TestResponse::decode_as`], which honours the declared content type.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an application response.
    pub async fn from_http(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// A header value as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// The raw `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The declared media type, falling back to JSON.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        MediaType::from_headers(&self.headers).unwrap_or_default()
    }

    /// Raw body bytes. Possibly empty.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Decode` if the body is not UTF-8.
    pub fn text(&self) -> HarnessResult<&str> {
        std::str::from_utf8(&self.body).map_err(|e| HarnessError::decode(MediaType::PlainText, e))
    }

    /// Decodes the body into `T` using the declared content type.
    ///
    /// The status is not consulted: a 404 with a body that decodes as `T`
    /// decodes fine.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Decode` if the body does not match `T`.
    pub fn decode_as<T: DeserializeOwned + Any>(&self) -> HarnessResult<T> {
        ContentCodec::decode(&self.body, &self.media_type())
    }

    /// Decodes the body as an untyped JSON value.
    pub fn json_value(&self) -> HarnessResult<serde_json::Value> {
        ContentCodec::decode(&self.body, &MediaType::Json)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {:?}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    #[track_caller]
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        match self.header_str(name) {
            Some(actual) => assert_eq!(actual, expected, "header `{name}` mismatch"),
            None => panic!("header `{name}` not found"),
        }
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
