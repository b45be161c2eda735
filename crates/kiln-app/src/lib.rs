//! # Kiln App
//!
//! The application surface Kiln harnesses drive:
//!
//! - [`Application`] - configured application handle: exposes a [`Responder`]
//!   and runs administrative commands
//! - [`KilnConfig`] / [`ConfigLoader`] - typed, layered configuration
//! - [`Environment`] - execution mode and command arguments
//! - [`Services`] - type-keyed service registry
//! - [`Routes`], [`Middleware`], [`ErrorMiddleware`] - request handling
//! - [`Commands`], [`Migrations`] - `routes`, `migrate` and `revert`
//!
//! # Example
//!
//! ```rust
//! use kiln_app::{Application, Environment, Json, KilnConfig, Request, Routes, Services};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut routes = Routes::new();
//! routes.get("/test", |_req: Request| async {
//!     Ok(Json(json!({"value": "Hello, world!"})))
//! });
//!
//! let mut services = Services::default_services();
//! services.register(Arc::new(routes));
//!
//! let app = Application::new(KilnConfig::default(), Environment::testing(), services).unwrap();
//! assert!(app.responder().is_some());
//! ```

#![doc(html_root_url = "https://docs.rs/kiln-app/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod command;
mod config;
mod content;
mod environment;
mod error;
mod middleware;
mod migration;
mod request;
mod responder;
mod response;
mod routing;
mod services;
pub mod telemetry;

pub use application::Application;
pub use command::{
    Command, CommandContext, Commands, MigrateCommand, RevertCommand, RoutesCommand,
};
pub use config::{
    AppConfig, CommandConfig, ConfigError, ConfigLoader, KilnConfig, LogFormat, LoggingConfig,
    TestingConfig,
};
pub use content::MediaType;
pub use environment::{Environment, DEFAULT_EXECUTABLE};
pub use error::{AppError, AppResult};
pub use middleware::{BoxFuture, ErrorMiddleware, Middleware, MiddlewareConfig, Next};
pub use migration::{Migration, MigrationLog, MigrationRecord, Migrations};
pub use request::Request;
pub use responder::{DefaultResponder, Responder};
pub use response::{IntoResponse, Json, Response};
pub use routing::{Handler, Routes};
pub use services::Services;
