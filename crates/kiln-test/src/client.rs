//! Request helpers on [`Application`].

use std::any::Any;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use kiln_app::{Application, MediaType};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dispatch::Dispatcher;
use crate::error::HarnessResult;
use crate::request::{Encodable, RequestBuilder, TestRequest};
use crate::response::TestResponse;

/// Sends in-process requests to an [`Application`].
///
/// # Example
///
/// ```
/// use kiln_app::{Json, Routes};
/// use kiln_test::{EmptyContent, Testable, TestableApplication};
/// use http::{HeaderMap, Method};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// struct Greeter;
///
/// impl Testable for Greeter {
///     fn routes(&self, routes: &mut Routes) -> kiln_app::AppResult<()> {
///         routes.get("/test", |_req| async { Ok(Json(json!({"value": "Hello, world!"}))) });
///         Ok(())
///     }
/// }
///
/// #[derive(Deserialize)]
/// struct Greeting {
///     value: String,
/// }
///
/// let app = Greeter.make_application(None).unwrap();
/// let greeting: Greeting = app
///     .get_response("/test", Method::GET, &HeaderMap::new(), None::<EmptyContent>, None::<EmptyContent>)
///     .unwrap();
/// assert_eq!(greeting.value, "Hello, world!");
/// ```
pub trait TestableApplication {
    /// A dispatcher bound to this application.
    fn dispatcher(&self) -> Dispatcher;

    /// Builds and dispatches a request, returning the raw response.
    ///
    /// # Errors
    ///
    /// Any error from [`TestRequest::build`] or [`Dispatcher::dispatch`].
    fn send_request<Q, B>(
        &self,
        path: &str,
        method: Method,
        headers: &HeaderMap,
        query: Option<Q>,
        body: Option<B>,
    ) -> HarnessResult<TestResponse>
    where
        Q: Encodable,
        B: Encodable,
    {
        let request = TestRequest::build(path, method, headers, query.as_ref(), body.as_ref())?;
        self.dispatcher().dispatch(request)
    }

    /// Builds and dispatches a request, decoding the body as `T`.
    ///
    /// A non-2xx status is not an error by itself; only a body that does not
    /// decode as `T` is.
    fn get_response<T, Q, B>(
        &self,
        path: &str,
        method: Method,
        headers: &HeaderMap,
        query: Option<Q>,
        body: Option<B>,
    ) -> HarnessResult<T>
    where
        T: DeserializeOwned + Any,
        Q: Encodable,
        B: Encodable,
    {
        self.send_request(path, method, headers, query, body)?
            .decode_as()
    }

    /// Starts a fluent request.
    fn request(&self, method: Method, path: &str) -> ClientRequest<'_>;
}

impl TestableApplication for Application {
    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self)
    }

    fn request(&self, method: Method, path: &str) -> ClientRequest<'_> {
        ClientRequest {
            app: self,
            builder: RequestBuilder::new(method, path),
        }
    }
}

/// A request bound to an application.
///
/// ```
/// # use kiln_app::Routes;
/// # use kiln_test::{Testable, TestableApplication};
/// # use http::{Method, StatusCode};
/// # struct Echo;
/// # impl Testable for Echo {
/// #     fn routes(&self, routes: &mut Routes) -> kiln_app::AppResult<()> {
/// #         routes.post("/echo", |req| async move { req.content::<String>() });
/// #         Ok(())
/// #     }
/// # }
/// let app = Echo.make_application(None).unwrap();
/// let response = app
///     .request(Method::POST, "/echo")
///     .content_type(&kiln_app::MediaType::PlainText)
///     .body("hello")
///     .send()
///     .unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.text().unwrap(), "hello");
/// ```
#[must_use]
#[derive(Debug)]
pub struct ClientRequest<'a> {
    app: &'a Application,
    builder: RequestBuilder,
}

impl ClientRequest<'_> {
    /// Sets a header.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Display,
    {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Adds every header in `headers`.
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        self.builder = self.builder.headers(headers);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, media_type: &MediaType) -> Self {
        self.builder = self.builder.content_type(media_type);
        self
    }

    /// Sets the query value.
    pub fn query<Q: Serialize + 'static>(mut self, query: Q) -> Self {
        self.builder = self.builder.query(query);
        self
    }

    /// Sets the body value.
    pub fn body<B: Serialize + 'static>(mut self, body: B) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Dispatches the request.
    pub fn send(self) -> HarnessResult<TestResponse> {
        let request = self.builder.build()?;
        self.app.dispatcher().dispatch(request)
    }

    /// Dispatches the request and decodes the body as `T`.
    pub fn decode<T: DeserializeOwned + Any>(self) -> HarnessResult<T> {
        self.send()?.decode_as()
    }
}
