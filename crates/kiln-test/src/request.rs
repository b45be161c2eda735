//! Test request building.
//!
//! [`TestRequest::build`] assembles a request envelope in a fixed order:
//!
//! 1. copy the caller's headers
//! 2. default `Content-Type` to `application/json` when none is present
//! 3. parse the path
//! 4. encode the body with the negotiated content type
//! 5. encode the query and attach it to the URI
//!
//! Omitting the body or query is equivalent to passing [`EmptyContent`](crate::EmptyContent).

use std::fmt;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use kiln_app::MediaType;
use serde::Serialize;

use crate::codec::ContentCodec;
use crate::error::{HarnessError, HarnessResult};

/// `Content-Type` added when the caller supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A value that can be sent as a body or query.
///
/// Implemented for every `Serialize` type; it lets a builder hold a
/// payload before the content type is known.
pub trait Encodable {
    /// Encodes as a body of the given media type.
    fn encode_body(&self, media_type: &MediaType) -> HarnessResult<Option<Bytes>>;

    /// Encodes as a query string.
    fn encode_query(&self) -> HarnessResult<Option<String>>;
}

impl<T: Serialize> Encodable for T {
    fn encode_body(&self, media_type: &MediaType) -> HarnessResult<Option<Bytes>> {
        ContentCodec::encode(self, media_type)
    }

    fn encode_query(&self) -> HarnessResult<Option<String>> {
        ContentCodec::encode_query(self)
    }
}

/// A synthetic request envelope.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URI, including any encoded query.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encoded body, if any.
    pub body: Option<Bytes>,
    /// Encoded query string, if one was attached.
    pub query: Option<String>,
}

impl TestRequest {
    /// Builds a request envelope.
    ///
    /// # Errors
    ///
    /// - `HarnessError::PathParse` if `path` is not a valid URI path
    /// - `HarnessError::Encode` if the body or query cannot be encoded
    ///
    /// # Example
    ///
    /// ```
    /// use kiln_test::{EmptyContent, TestRequest};
    /// use http::{HeaderMap, Method};
    /// use serde_json::json;
    ///
    /// let request = TestRequest::build(
    ///     "/todos",
    ///     Method::GET,
    ///     &HeaderMap::new(),
    ///     Some(&json!({"page": 1})),
    ///     None::<&EmptyContent>,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(request.uri, "/todos?page=1");
    /// assert_eq!(request.headers["content-type"], "application/json");
    /// assert!(request.body.is_none());
    /// ```
    pub fn build<Q, B>(
        path: &str,
        method: Method,
        headers: &HeaderMap,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> HarnessResult<Self>
    where
        Q: Encodable,
        B: Encodable,
    {
        assemble(
            path,
            method,
            headers.clone(),
            query.map(|q| q as &dyn Encodable),
            body.map(|b| b as &dyn Encodable),
        )
    }

    /// Starts a fluent builder.
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    /// The negotiated content type.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        MediaType::from_headers(&self.headers).unwrap_or_default()
    }

    /// Converts into an `http::Request`.
    #[must_use]
    pub fn into_http_request(self) -> http::Request<Full<Bytes>> {
        let mut request = http::Request::new(Full::new(self.body.unwrap_or_default()));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

fn assemble(
    path: &str,
    method: Method,
    mut headers: HeaderMap,
    query: Option<&dyn Encodable>,
    body: Option<&dyn Encodable>,
) -> HarnessResult<TestRequest> {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        );
    }

    let target = normalize_path(path)?;
    let uri = parse_uri(path, &target)?;

    let media_type = MediaType::from_headers(&headers).unwrap_or_default();
    let body = match body {
        Some(body) => body.encode_body(&media_type)?,
        None => None,
    };

    let query = match query {
        Some(query) => query.encode_query()?.filter(|q| !q.is_empty()),
        None => None,
    };

    let uri = match &query {
        Some(query) => {
            let separator = if uri.query().is_some() { '&' } else { '?' };
            parse_uri(path, &format!("{target}{separator}{query}"))?
        }
        None => uri,
    };

    Ok(TestRequest {
        method,
        uri,
        headers,
        body,
        query,
    })
}

/// Roots relative paths so that `test` means `/test`.
fn normalize_path(path: &str) -> HarnessResult<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(HarnessError::PathParse {
            path: path.to_string(),
            reason: "path is empty".to_string(),
        });
    }

    if trimmed.starts_with('/') || trimmed.contains("://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

fn parse_uri(original: &str, target: &str) -> HarnessResult<Uri> {
    target.parse::<Uri>().map_err(|e| HarnessError::PathParse {
        path: original.to_string(),
        reason: e.to_string(),
    })
}

/// Fluent builder for [`TestRequest`].
///
/// Header errors are deferred and reported by [`RequestBuilder::build`].
///
/// # Example
///
/// ```
/// use kiln_test::TestRequest;
/// use http::Method;
/// use serde_json::json;
///
/// let request = TestRequest::builder(Method::POST, "/todos")
///     .header("x-request-id", "42")
///     .body(json!({"title": "ship it"}))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.body.unwrap(), r#"{"title":"ship it"}"#);
/// ```
#[must_use]
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Option<Box<dyn Encodable>>,
    body: Option<Box<dyn Encodable>>,
    error: Option<HarnessError>,
}

impl RequestBuilder {
    /// Creates a builder.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: None,
            body: None,
            error: None,
        }
    }

    /// Adds every header in `headers`, replacing same-named ones.
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        self.headers.extend(headers.clone());
        self
    }

    /// Sets a header.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        if self.error.is_some() {
            return self;
        }

        match name.try_into() {
            Ok(name) => match value.try_into() {
                Ok(value) => {
                    self.headers.insert(name, value);
                }
                Err(e) => {
                    self.error = Some(HarnessError::InvalidHeader {
                        name: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            },
            Err(e) => {
                self.error = Some(HarnessError::InvalidHeader {
                    name: "<invalid>".to_string(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, media_type: &MediaType) -> Self {
        self.header(CONTENT_TYPE, media_type.as_str())
    }

    /// Sets the query value.
    pub fn query<Q: Serialize + 'static>(mut self, query: Q) -> Self {
        self.query = Some(Box::new(query));
        self
    }

    /// Sets the body value.
    pub fn body<B: Serialize + 'static>(mut self, body: B) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first deferred header error, or any error from
    /// [`TestRequest::build`].
    pub fn build(self) -> HarnessResult<TestRequest> {
        if let Some(err) = self.error {
            return Err(err);
        }

        assemble(
            &self.path,
            self.method,
            self.headers,
            self.query.as_deref(),
            self.body.as_deref(),
        )
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("has_query", &self.query.is_some())
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}
