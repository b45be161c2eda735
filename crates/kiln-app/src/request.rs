//! The request seen by middleware and route handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::content::MediaType;
use crate::error::{AppError, AppResult};
use crate::services::Services;

/// An incoming request together with the services of the application that
/// is handling it.
///
/// # Example
///
/// ```
/// use kiln_app::{Request, Services};
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// let req = Request::new(
///     Method::GET,
///     Uri::from_static("/users?page=2"),
///     HeaderMap::new(),
///     Bytes::new(),
///     Arc::new(Services::new()),
/// );
///
/// assert_eq!(req.path(), "/users");
/// ```
pub struct Request {
    id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    services: Arc<Services>,
}

impl Request {
    /// Creates a request from its parts.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        services: Arc<Services>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            uri,
            headers,
            body,
            params: HashMap::new(),
            services,
        }
    }

    /// Converts an `http::Request`, buffering its body.
    pub async fn from_http(request: http::Request<Full<Bytes>>, services: Arc<Services>) -> Self {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        Self::new(parts.method, parts.uri, parts.headers, body, services)
    }

    /// Unique identifier assigned when the request was created.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The declared media type, falling back to JSON.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        MediaType::from_headers(&self.headers).unwrap_or_default()
    }

    /// Decodes the body according to the request's content type.
    ///
    /// # Errors
    ///
    /// - `AppError::Content` if the body does not match `T`
    /// - `AppError::Abort` with `415 Unsupported Media Type` for content
    ///   types without a decoder
    pub fn content<T: DeserializeOwned>(&self) -> AppResult<T> {
        match self.media_type() {
            MediaType::Json => self.json(),
            MediaType::UrlEncodedForm => serde_urlencoded::from_bytes(&self.body)
                .map_err(|e| AppError::content(format!("invalid form body: {e}"))),
            MediaType::PlainText => {
                let text = std::str::from_utf8(&self.body)
                    .map_err(|e| AppError::content(format!("body is not UTF-8: {e}")))?;
                serde_json::from_value(serde_json::Value::String(text.to_string()))
                    .map_err(|e| AppError::content(format!("invalid text body: {e}")))
            }
            MediaType::Other(other) => Err(AppError::abort(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("no decoder for media type {other}"),
            )),
        }
    }

    /// Decodes the body as JSON regardless of the content type.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Content` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::content(format!("invalid JSON body: {e}")))
    }

    /// Decodes the query string. A missing query decodes like an empty one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Content` if the query does not match `T`.
    pub fn query<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_urlencoded::from_str(self.uri.query().unwrap_or_default())
            .map_err(|e| AppError::content(format!("invalid query string: {e}")))
    }

    /// Returns a route parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All route parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// The services of the handling application.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Resolves a registered service.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceNotRegistered` if `T` was never registered.
    pub fn make<T: Send + Sync + 'static>(&self) -> AppResult<Arc<T>> {
        self.services.resolve_required()
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("body_len", &self.body.len())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
