//! Submitting requests to an application's responder.

use std::time::Duration;

use kiln_app::{Application, KilnConfig, Request};

use crate::error::{HarnessError, HarnessResult};
use crate::request::TestRequest;
use crate::response::TestResponse;
use crate::runtime;

/// Per-dispatcher settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Abort a dispatch that has not settled after this long.
    ///
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl DispatchOptions {
    /// Options without a timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Options taken from the `[testing]` configuration section.
    #[must_use]
    pub fn from_config(config: &KilnConfig) -> Self {
        Self {
            timeout: config.dispatch_timeout(),
        }
    }
}

/// Sends [`TestRequest`]s to an application and buffers the responses.
///
/// # Example
///
/// ```
/// use kiln_app::{Application, Environment, KilnConfig, Routes, Services};
/// use kiln_test::{Dispatcher, TestRequest};
/// use http::{Method, StatusCode};
/// use std::sync::Arc;
///
/// let mut routes = Routes::new();
/// routes.get("/ping", |_req| async { Ok("pong") });
///
/// let mut services = Services::default_services();
/// services.register(Arc::new(routes));
/// let app = Application::new(KilnConfig::default(), Environment::testing(), services).unwrap();
///
/// let request = TestRequest::builder(Method::GET, "/ping").build().unwrap();
/// let response = Dispatcher::new(&app).dispatch(request).unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.text().unwrap(), "pong");
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    app: Application,
    options: DispatchOptions,
}

impl Dispatcher {
    /// Creates a dispatcher using the application's configured options.
    pub fn new(app: &Application) -> Self {
        Self {
            options: DispatchOptions::from_config(app.config()),
            app: app.clone(),
        }
    }

    /// Overrides the dispatch options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Active options.
    #[must_use]
    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Dispatches `request` and blocks until the responder settles.
    ///
    /// Callable from synchronous tests and from inside an async runtime.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Configuration` if the application has no responder
    /// - `HarnessError::UnderlyingApplication` if the responder fails or panics
    /// - `HarnessError::Timeout` if the configured timeout elapses
    /// - `HarnessError::Runtime` if the dispatch runtime is unavailable
    pub fn dispatch(&self, request: TestRequest) -> HarnessResult<TestResponse> {
        let app = self.app.clone();
        let timeout = self.options.timeout;
        runtime::block_on(runtime::supervise(respond(app, request), timeout))?.and_then(|r| r)
    }

    /// Dispatches `request` from async code.
    ///
    /// Same error semantics as [`Dispatcher::dispatch`], without blocking a
    /// thread.
    pub async fn dispatch_async(&self, request: TestRequest) -> HarnessResult<TestResponse> {
        let app = self.app.clone();
        runtime::supervise(respond(app, request), self.options.timeout).await?
    }
}

async fn respond(app: Application, request: TestRequest) -> HarnessResult<TestResponse> {
    let responder = app.responder().ok_or_else(|| {
        HarnessError::Configuration("no responder; register a `Routes` service".to_string())
    })?;

    let method = request.method.clone();
    let uri = request.uri.clone();
    let request = Request::from_http(request.into_http_request(), app.services().clone()).await;
    let request_id = request.id();

    let response = responder
        .respond(request)
        .await
        .map_err(HarnessError::UnderlyingApplication)?;
    let response = TestResponse::from_http(response).await;

    tracing::debug!(
        %request_id,
        %method,
        %uri,
        status = response.status_code(),
        "dispatched test request"
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use kiln_app::{AppError, Environment, Routes, Services};
    use std::sync::Arc;

    fn app_with(routes: Option<Routes>, config: KilnConfig) -> Application {
        let mut services = Services::default_services();
        if let Some(routes) = routes {
            services.register(Arc::new(routes));
        }
        Application::new(config, Environment::testing(), services).unwrap()
    }

    fn get(path: &str) -> TestRequest {
        TestRequest::builder(Method::GET, path).build().unwrap()
    }

    #[test]
    fn test_no_responder_is_configuration_error() {
        let app = app_with(None, KilnConfig::default());
        let err = Dispatcher::new(&app).dispatch(get("/")).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn test_responder_error_is_wrapped() {
        let mut routes = Routes::new();
        routes.get("/fail", |_req| async {
            Err::<&'static str, _>(AppError::bad_request("nope"))
        });
        let app = app_with(Some(routes), KilnConfig::default());

        let err = Dispatcher::new(&app).dispatch(get("/fail")).unwrap_err();
        match err {
            HarnessError::UnderlyingApplication(AppError::Abort { status, .. }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_from_config() {
        let mut routes = Routes::new();
        routes.get("/slow", |_req| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("late")
        });
        let mut config = KilnConfig::testing();
        config.testing.dispatch_timeout_ms = Some(20);
        let app = app_with(Some(routes), config);

        let dispatcher = Dispatcher::new(&app);
        assert_eq!(dispatcher.options().timeout, Some(Duration::from_millis(20)));

        let err = dispatcher.dispatch(get("/slow")).unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_async() {
        let mut routes = Routes::new();
        routes.get("/ping", |_req| async { Ok("pong") });
        let app = app_with(Some(routes), KilnConfig::default());

        let response = Dispatcher::new(&app)
            .with_options(DispatchOptions::new().with_timeout(Duration::from_secs(5)))
            .dispatch_async(get("/ping"))
            .await
            .unwrap();
        assert_eq!(response.text().unwrap(), "pong");
    }
}
