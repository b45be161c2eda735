//! The application handle.

use std::fmt;
use std::sync::Arc;

use crate::command::{CommandContext, Commands};
use crate::config::KilnConfig;
use crate::environment::Environment;
use crate::error::AppResult;
use crate::middleware::MiddlewareConfig;
use crate::responder::{DefaultResponder, Responder};
use crate::routing::Routes;
use crate::services::Services;

struct Inner {
    config: KilnConfig,
    environment: Environment,
    services: Arc<Services>,
    responder: Option<Arc<dyn Responder>>,
}

/// A configured application.
///
/// Cloning is cheap; clones share configuration, services and responder.
///
/// # Example
///
/// ```
/// use kiln_app::{Application, Environment, KilnConfig, Routes, Services};
/// use std::sync::Arc;
///
/// let mut services = Services::default_services();
/// services.register(Arc::new(Routes::new()));
///
/// let app = Application::new(KilnConfig::default(), Environment::testing(), services).unwrap();
/// assert!(app.responder().is_some());
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<Inner>,
}

impl Application {
    /// Builds an application.
    ///
    /// A [`DefaultResponder`] is created when a [`Routes`] service is
    /// registered; it runs the registered [`MiddlewareConfig`], if any, in
    /// front of the routes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the configuration is invalid.
    pub fn new(config: KilnConfig, environment: Environment, services: Services) -> AppResult<Self> {
        config.validate()?;

        let responder = services.resolve::<Routes>().map(|routes| {
            let middleware = services
                .resolve::<MiddlewareConfig>()
                .unwrap_or_default();
            Arc::new(DefaultResponder::new(routes, middleware)) as Arc<dyn Responder>
        });

        tracing::debug!(
            app = %config.app.name,
            environment = %environment,
            services = services.len(),
            has_responder = responder.is_some(),
            "application created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                environment,
                services: Arc::new(services),
                responder,
            }),
        })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &KilnConfig {
        &self.inner.config
    }

    /// The environment the application was built for.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// Registered services.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.inner.services
    }

    /// Resolves a registered service.
    pub fn make<T: Send + Sync + 'static>(&self) -> AppResult<Arc<T>> {
        self.inner.services.resolve_required()
    }

    /// The request responder, or `None` if no routes were registered.
    #[must_use]
    pub fn responder(&self) -> Option<Arc<dyn Responder>> {
        self.inner.responder.clone()
    }

    /// Runs the command selected by the environment's arguments to completion.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceNotRegistered` without a [`Commands`]
    /// service, `AppError::Command` if the arguments do not parse, or
    /// whatever the command itself fails with.
    pub async fn run(&self) -> AppResult<()> {
        self.run_with(&self.inner.environment.arguments).await
    }

    /// Runs the command selected by `arguments` to completion.
    pub async fn run_with(&self, arguments: &[String]) -> AppResult<()> {
        let commands = self.make::<Commands>()?;
        let (command, matches) =
            commands.parse(arguments, &self.inner.config.commands.default_command)?;

        tracing::info!(
            command = command.name(),
            environment = %self.inner.environment,
            "running command"
        );

        let ctx = CommandContext {
            app: self.clone(),
            matches,
        };
        command.run(ctx).await
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.inner.config.app.name)
            .field("environment", &self.inner.environment.name)
            .field("services", &self.inner.services)
            .field("has_responder", &self.inner.responder.is_some())
            .finish()
    }
}
