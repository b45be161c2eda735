//! Route registration and dispatch.
//!
//! [`Routes`] pairs the method/path table from `kiln-router` with async
//! handlers. A handler takes the [`Request`] by value and returns anything
//! that implements [`IntoResponse`].
//!
//! # Example
//!
//! ```
//! use kiln_app::{Json, Request, Routes};
//! use serde_json::json;
//!
//! let mut routes = Routes::new();
//! routes.get("/test", |_req: Request| async {
//!     Ok(Json(json!({"value": "Hello, world!"})))
//! });
//! routes.get("/users/{id}", |req: Request| async move {
//!     Ok(req.param("id").unwrap_or_default().to_string())
//! });
//!
//! assert_eq!(routes.route_count(), 2);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::{Method, StatusCode};
use kiln_router::Router;

use crate::error::{AppError, AppResult};
use crate::middleware::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A type-erased route handler.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, AppResult<Response>> + Send + Sync>;

/// The application's route table.
#[derive(Default)]
pub struct Routes {
    router: Router<Handler>,
}

impl Routes {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Registers a handler for `method` and `path`.
    ///
    /// Earlier registrations win when several patterns match.
    pub fn on<H, Fut, R>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        let handler: Handler = Arc::new(move |request| -> BoxFuture<'static, AppResult<Response>> {
            let fut = handler(request);
            Box::pin(async move { fut.await?.into_response() })
        });
        self.router.add_route(method, path, handler);
        self
    }

    /// Registers a `GET` handler.
    pub fn get<H, Fut, R>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(Method::GET, path, handler)
    }

    /// Registers a `POST` handler.
    pub fn post<H, Fut, R>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(Method::POST, path, handler)
    }

    /// Registers a `PUT` handler.
    pub fn put<H, Fut, R>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(Method::PUT, path, handler)
    }

    /// Registers a `PATCH` handler.
    pub fn patch<H, Fut, R>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(Method::PATCH, path, handler)
    }

    /// Registers a `DELETE` handler.
    pub fn delete<H, Fut, R>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(Method::DELETE, path, handler)
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Lists registered routes as `(method, path)` in registration order.
    pub fn descriptions(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.router.descriptions()
    }

    /// Routes a request to its handler.
    ///
    /// Fails with `AppError::NotFound` when no pattern matches the path, and
    /// with `405 Method Not Allowed` when the path exists under another
    /// method.
    pub fn dispatch(&self, mut request: Request) -> BoxFuture<'static, AppResult<Response>> {
        let found = self
            .router
            .match_route(request.method(), request.path())
            .map(|m| (Arc::clone(m.value()), m.into_params()));

        match found {
            Some((handler, params)) => {
                request.set_params(params);
                handler(request)
            }
            None => {
                let err = self.unmatched(&request);
                Box::pin(std::future::ready(Err(err)))
            }
        }
    }

    fn unmatched(&self, request: &Request) -> AppError {
        if self.router.matches_path(request.path()) {
            AppError::abort(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("method {} not allowed for {}", request.method(), request.path()),
            )
        } else {
            AppError::NotFound {
                method: request.method().clone(),
                path: request.path().to_string(),
            }
        }
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("route_count", &self.route_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Json;
    use crate::services::Services;
    use bytes::Bytes;
    use http::{HeaderMap, Uri};
    use http_body_util::BodyExt;

    fn request(method: Method, uri: &'static str) -> Request {
        Request::new(
            method,
            Uri::from_static(uri),
            HeaderMap::new(),
            Bytes::new(),
            Arc::new(Services::new()),
        )
    }

    fn routes() -> Routes {
        let mut routes = Routes::new();
        routes
            .get("/test", |_req| async { Ok(Json("hello")) })
            .get("/users/{id}", |req: Request| async move {
                Ok(format!("user {}", req.param("id").unwrap_or_default()))
            })
            .post("/fail", |_req| async {
                Err::<StatusCode, _>(AppError::bad_request("nope"))
            });
        routes
    }

    #[tokio::test]
    async fn test_dispatch_match() {
        let response = routes()
            .dispatch(request(Method::GET, "/users/42"))
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"user 42"));
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let err = routes()
            .dispatch(request(Method::GET, "/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_method_not_allowed() {
        let err = routes()
            .dispatch(request(Method::DELETE, "/test"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let err = routes()
            .dispatch(request(Method::POST, "/fail"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_descriptions() {
        let routes = routes();
        let listed: Vec<_> = routes
            .descriptions()
            .map(|(m, p)| format!("{m} {p}"))
            .collect();
        assert_eq!(listed, vec!["GET /test", "GET /users/{id}", "POST /fail"]);
    }
}
