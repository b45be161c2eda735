//! Harness configuration from `KILN__` environment variables.
//!
//! Kept in its own test binary: the variables are process-wide.

use std::env;
use std::time::Duration;

use http::{Method, StatusCode};
use kiln_app::{AppError, AppResult, Routes};
use kiln_test::{HarnessError, Testable, TestableApplication};

struct SlowApp;

impl Testable for SlowApp {
    fn routes(&self, routes: &mut Routes) -> AppResult<()> {
        routes.get("/slow", |_req| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(StatusCode::NO_CONTENT)
        });
        routes.get("/fast", |_req| async { Ok(StatusCode::NO_CONTENT) });
        Ok(())
    }
}

#[test]
fn test_env_overrides_reach_dispatcher() {
    env::set_var("KILN__TESTING__DISPATCH_TIMEOUT_MS", "40");
    let app = SlowApp.make_application(None).unwrap();
    env::remove_var("KILN__TESTING__DISPATCH_TIMEOUT_MS");

    assert_eq!(app.config().dispatch_timeout(), Some(Duration::from_millis(40)));
    assert_eq!(
        app.dispatcher().options().timeout,
        Some(Duration::from_millis(40))
    );

    let err = app.request(Method::GET, "/slow").send().unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Timeout { timeout } if timeout == Duration::from_millis(40)
    ));

    let response = app.request(Method::GET, "/fast").send().unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    env::set_var("KILN__TESTING__DISPATCH_TIMEOUT_MS", "soon");
    let err = SlowApp.make_application(None).unwrap_err();
    env::remove_var("KILN__TESTING__DISPATCH_TIMEOUT_MS");
    assert!(matches!(err, AppError::Config(_)));

    let app = SlowApp.make_application(None).unwrap();
    assert_eq!(app.dispatcher().options().timeout, None);
}
