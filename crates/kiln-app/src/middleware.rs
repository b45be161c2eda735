//! Middleware chain.
//!
//! Middleware wraps route dispatch: each stage receives the request and a
//! [`Next`] handle for the rest of the chain, and may inspect or replace the
//! result. Stages run in the order they were added to [`MiddlewareConfig`].
//!
//! # Example
//!
//! ```
//! use kiln_app::{BoxFuture, AppResult, Middleware, Next, Request, Response};
//!
//! struct ServerHeader;
//!
//! impl Middleware for ServerHeader {
//!     fn name(&self) -> &'static str {
//!         "server-header"
//!     }
//!
//!     fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
//!         Box::pin(async move {
//!             let mut response = next.run(request).await?;
//!             response
//!                 .headers_mut()
//!                 .insert("server", http::HeaderValue::from_static("kiln"));
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::environment::Environment;
use crate::error::{AppError, AppResult};
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::routing::Routes;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stage in the request chain.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and in [`MiddlewareConfig::names`].
    fn name(&self) -> &'static str;

    /// Handles the request, usually by calling `next.run(request)`.
    fn respond<'a>(&'a self, request: Request, next: Next<'a>)
        -> BoxFuture<'a, AppResult<Response>>;
}

/// The remainder of the chain after the current stage.
///
/// Consumed by [`Next::run`], so it can be invoked at most once.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    routes: &'a Routes,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], routes: &'a Routes) -> Self {
        Self { chain, routes }
    }

    /// Runs the next stage, or dispatches to the routes at the end of the chain.
    pub async fn run(self, request: Request) -> AppResult<Response> {
        match self.chain.split_first() {
            Some((stage, rest)) => {
                let next = Next::new(rest, self.routes);
                stage.respond(request, next).await
            }
            None => self.routes.dispatch(request).await,
        }
    }
}

/// Ordered list of middleware stages, registered as a service.
#[derive(Clone, Default)]
pub struct MiddlewareConfig {
    stages: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage to the end of the chain.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if no stages are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn stages(&self) -> &[Arc<dyn Middleware>] {
        &self.stages
    }
}

impl fmt::Debug for MiddlewareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConfig")
            .field("stages", &self.names())
            .finish()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: bool,
    reason: &'a str,
}

/// Turns errors from later stages and handlers into JSON responses.
///
/// The body is `{"error": true, "reason": "..."}` and the status comes from
/// [`AppError::status`]. Unless internal errors are exposed, the reason of
/// a 5xx error is replaced by the status' canonical text.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMiddleware {
    expose_internal_errors: bool,
}

impl Default for ErrorMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorMiddleware {
    /// Creates the middleware with internal error details hidden.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expose_internal_errors: false,
        }
    }

    /// Creates the middleware for an environment: internal details are shown
    /// everywhere except release environments.
    #[must_use]
    pub fn for_environment(environment: &Environment) -> Self {
        Self::new().expose_internal_errors(!environment.is_release)
    }

    /// Sets whether 5xx reasons are sent to the client.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Converts an error into its response.
    ///
    /// # Errors
    ///
    /// Fails only if the error body cannot be serialized.
    pub fn error_response(&self, err: &AppError) -> AppResult<Response> {
        let status = err.status();
        let message = err.to_string();
        let reason = if status.is_server_error() && !self.expose_internal_errors {
            status.canonical_reason().unwrap_or("Internal Server Error")
        } else {
            message.as_str()
        };

        (
            status,
            Json(ErrorBody {
                error: true,
                reason,
            }),
        )
            .into_response()
    }
}

impl Middleware for ErrorMiddleware {
    fn name(&self) -> &'static str {
        "error"
    }

    fn respond<'a>(
        &'a self,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.path().to_string();

            match next.run(request).await {
                Ok(response) => Ok(response),
                Err(err) => {
                    tracing::warn!(
                        %method,
                        path = %path,
                        status = err.status().as_u16(),
                        error = %err,
                        "request failed"
                    );
                    self.error_response(&err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn respond<'a>(
            &'a self,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, AppResult<Response>> {
            Box::pin(async move {
                self.log.lock().push(self.name);
                next.run(request).await
            })
        }
    }

    fn request(method: Method, uri: &'static str) -> Request {
        Request::new(
            method,
            Uri::from_static(uri),
            HeaderMap::new(),
            Bytes::new(),
            Arc::new(Services::new()),
        )
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut config = MiddlewareConfig::new();
        config
            .use_middleware(Recording {
                name: "first",
                log: Arc::clone(&log),
            })
            .use_middleware(Recording {
                name: "second",
                log: Arc::clone(&log),
            });

        let mut routes = Routes::new();
        routes.get("/", |_req| async { Ok(StatusCode::OK) });

        let response = Next::new(config.stages(), &routes)
            .run(request(Method::GET, "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(config.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_error_middleware_not_found() {
        let mut config = MiddlewareConfig::new();
        config.use_middleware(ErrorMiddleware::new());
        let routes = Routes::new();

        let response = Next::new(config.stages(), &routes)
            .run(request(Method::GET, "/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_of(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["reason"], "no route found for GET /missing");
    }

    #[tokio::test]
    async fn test_error_middleware_hides_internal_reason() {
        let hidden = ErrorMiddleware::for_environment(&Environment::production());
        let response = hidden
            .error_response(&AppError::internal("db password wrong"))
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["reason"], "Internal Server Error");

        let shown = ErrorMiddleware::for_environment(&Environment::testing());
        let response = shown
            .error_response(&AppError::internal("db password wrong"))
            .unwrap();
        assert_eq!(json_of(response).await["reason"], "db password wrong");
    }

    #[tokio::test]
    async fn test_error_middleware_keeps_client_reason() {
        let response = ErrorMiddleware::new()
            .error_response(&AppError::bad_request("missing name"))
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["reason"], "missing name");
    }
}
