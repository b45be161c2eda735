//! End-to-end application tests.
//!
//! These build a full application (routes, error middleware, migrations)
//! and drive it through its two public surfaces:
//!
//! 1. The responder - request in, response out
//! 2. Commands - `migrate` and `revert` against a shared migration log

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use kiln_app::{
    AppError, AppResult, Application, BoxFuture, Environment, ErrorMiddleware, Json, KilnConfig,
    Migration, MigrationLog, MiddlewareConfig, Migrations, Request, Response, Routes, Services,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

/// Records prepare/revert calls into a shared list.
struct Recorded {
    name: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

impl Migration for Recorded {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            self.events.lock().push(format!("prepare {}", self.name));
            Ok(())
        })
    }

    fn revert<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            self.events.lock().push(format!("revert {}", self.name));
            Ok(())
        })
    }
}

/// Builds an application with two routes, error middleware and two migrations.
fn make_app(
    environment: Environment,
    log: &Arc<MigrationLog>,
    events: &Arc<Mutex<Vec<String>>>,
) -> Application {
    let mut routes = Routes::new();
    routes
        .get("/test", |_req: Request| async {
            Ok(Json(json!({"value": "Hello, world!"})))
        })
        .post("/greet", |req: Request| async move {
            let greeting: Greeting = req.content()?;
            Ok((StatusCode::CREATED, format!("hello {}", greeting.name)))
        })
        .get("/boom", |_req: Request| async {
            Err::<StatusCode, _>(AppError::internal("disk on fire"))
        });

    let mut middleware = MiddlewareConfig::new();
    middleware.use_middleware(ErrorMiddleware::for_environment(&environment));

    let mut migrations = Migrations::with_log(Arc::clone(log));
    migrations
        .add(Recorded {
            name: "CreateUsers",
            events: Arc::clone(events),
        })
        .add(Recorded {
            name: "CreateTodos",
            events: Arc::clone(events),
        });

    let mut services = Services::default_services();
    services
        .register(Arc::new(routes))
        .register(Arc::new(middleware))
        .register(Arc::new(migrations));

    Application::new(KilnConfig::testing(), environment, services).unwrap()
}

async fn send(app: &Application, method: Method, uri: &str, body: &'static str) -> Response {
    let http_req = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap();
    let request = Request::from_http(http_req, Arc::clone(app.services())).await;
    app.responder().unwrap().respond(request).await.unwrap()
}

async fn body_of(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn fresh() -> (Arc<MigrationLog>, Arc<Mutex<Vec<String>>>) {
    (Arc::new(MigrationLog::new()), Arc::new(Mutex::new(Vec::new())))
}

#[tokio::test]
async fn test_get_json_route() {
    let (log, events) = fresh();
    let app = make_app(Environment::testing(), &log, &events);

    let response = send(&app, Method::GET, "/test", "").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body, json!({"value": "Hello, world!"}));
}

#[tokio::test]
async fn test_post_decodes_content() {
    let (log, events) = fresh();
    let app = make_app(Environment::testing(), &log, &events);

    let response = send(&app, Method::POST, "/greet", r#"{"name":"kiln"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_of(response).await, Bytes::from_static(b"hello kiln"));
}

#[tokio::test]
async fn test_bad_content_becomes_400() {
    let (log, events) = fresh();
    let app = make_app(Environment::testing(), &log, &events);

    let response = send(&app, Method::POST, "/greet", "{").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (log, events) = fresh();
    let app = make_app(Environment::testing(), &log, &events);

    let response = send(&app, Method::GET, "/nowhere", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_internal_error_hidden_in_production() {
    let (log, events) = fresh();
    let app = make_app(Environment::production(), &log, &events);

    let response = send(&app, Method::GET, "/boom", "").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["reason"], "Internal Server Error");
}

#[tokio::test]
async fn test_migrate_then_revert_all() {
    let (log, events) = fresh();

    let migrate = make_app(
        Environment::testing().with_arguments(["kiln", "migrate", "-y"]),
        &log,
        &events,
    );
    migrate.run().await.unwrap();
    assert_eq!(log.applied().len(), 2);

    let revert = make_app(
        Environment::testing().with_arguments(["kiln", "revert", "--all", "-y"]),
        &log,
        &events,
    );
    revert.run().await.unwrap();

    assert!(log.applied().is_empty());
    assert_eq!(
        *events.lock(),
        vec![
            "prepare CreateUsers",
            "prepare CreateTodos",
            "revert CreateTodos",
            "revert CreateUsers",
        ]
    );
}

#[tokio::test]
async fn test_migrate_requires_confirmation() {
    let (log, events) = fresh();
    let app = make_app(
        Environment::testing().with_arguments(["kiln", "migrate"]),
        &log,
        &events,
    );

    let err = app.run().await.unwrap_err();
    assert!(matches!(err, AppError::Command(_)));
    assert!(log.applied().is_empty());
    assert!(events.lock().is_empty());
}

#[tokio::test]
async fn test_run_with_overrides_environment_arguments() {
    let (log, events) = fresh();
    let app = make_app(Environment::testing(), &log, &events);

    app.run_with(&["kiln".to_string(), "migrate".to_string(), "-y".to_string()])
        .await
        .unwrap();
    assert_eq!(log.last_batch(), 1);
}
