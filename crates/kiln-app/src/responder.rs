//! Responders turn a request into a response.

use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::{BoxFuture, MiddlewareConfig, Next};
use crate::request::Request;
use crate::response::Response;
use crate::routing::Routes;

/// Produces a response for a request.
///
/// The returned future owns everything it needs, so it can be spawned onto
/// any runtime.
pub trait Responder: Send + Sync + 'static {
    /// Responds to `request`.
    fn respond(&self, request: Request) -> BoxFuture<'static, AppResult<Response>>;
}

/// Runs the configured middleware chain in front of the route table.
#[derive(Debug, Clone)]
pub struct DefaultResponder {
    middleware: Arc<MiddlewareConfig>,
    routes: Arc<Routes>,
}

impl DefaultResponder {
    /// Creates a responder from routes and middleware.
    #[must_use]
    pub fn new(routes: Arc<Routes>, middleware: Arc<MiddlewareConfig>) -> Self {
        Self { middleware, routes }
    }
}

impl Responder for DefaultResponder {
    fn respond(&self, request: Request) -> BoxFuture<'static, AppResult<Response>> {
        let middleware = Arc::clone(&self.middleware);
        let routes = Arc::clone(&self.routes);

        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let id = request.id();

            let result = Next::new(middleware.stages(), &routes).run(request).await;

            match &result {
                Ok(response) => tracing::debug!(
                    request_id = %id,
                    %method,
                    %uri,
                    status = response.status().as_u16(),
                    "request completed"
                ),
                Err(err) => tracing::debug!(
                    request_id = %id,
                    %method,
                    %uri,
                    error = %err,
                    "request failed without error middleware"
                ),
            }

            result
        })
    }
}
