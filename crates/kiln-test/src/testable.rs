//! Building applications for tests.

use std::sync::Arc;

use kiln_app::{
    AppError, AppResult, Application, ConfigLoader, Environment, ErrorMiddleware, KilnConfig,
    MiddlewareConfig, Routes, Services, DEFAULT_EXECUTABLE,
};

use crate::error::{HarnessError, RevertError};
use crate::runtime;

/// Prefix of environment variables that override harness configuration.
const ENV_PREFIX: &str = "KILN";

/// Describes how to build an application under test.
///
/// Every method has a default; implementors usually override only
/// [`routes`](Testable::routes) and perhaps [`services`](Testable::services).
/// Call [`make_application`](Testable::make_application) once per test case
/// and [`revert`](Testable::revert) to reset migrated state between cases.
///
/// # Example
///
/// ```
/// use kiln_app::{AppResult, Json, Routes};
/// use kiln_test::{Testable, TestableApplication};
/// use http::{Method, StatusCode};
/// use serde_json::json;
///
/// struct TodoApp;
///
/// impl Testable for TodoApp {
///     fn routes(&self, routes: &mut Routes) -> AppResult<()> {
///         routes.get("/todos", |_req| async { Ok(Json(json!([]))) });
///         Ok(())
///     }
/// }
///
/// let app = TodoApp.make_application(None).unwrap();
/// let response = app.request(Method::GET, "/todos").send().unwrap();
/// assert_eq!(response.status(), StatusCode::OK);
/// ```
pub trait Testable {
    /// Base configuration.
    ///
    /// The testing preset with `KILN__SECTION__KEY` environment overrides
    /// applied, e.g. `KILN__TESTING__DISPATCH_TIMEOUT_MS=500`.
    fn configuration(&self) -> AppResult<KilnConfig> {
        Ok(ConfigLoader::new()
            .with_testing()
            .with_env_prefix(ENV_PREFIX)
            .load()?)
    }

    /// Service registrations.
    fn services(&self) -> AppResult<Services> {
        Ok(Services::default_services())
    }

    /// Route registrations. None by default.
    fn routes(&self, _routes: &mut Routes) -> AppResult<()> {
        Ok(())
    }

    /// Runs after the application is constructed.
    fn boot(&self, _app: &Application) -> AppResult<()> {
        Ok(())
    }

    /// Wires routes and error handling into the services.
    ///
    /// Registers the routes from [`routes`](Testable::routes) as the router
    /// and an [`ErrorMiddleware`] in front of them.
    fn configure(
        &self,
        _config: &mut KilnConfig,
        environment: &mut Environment,
        services: &mut Services,
    ) -> AppResult<()> {
        let mut routes = Routes::new();
        self.routes(&mut routes)?;
        services.register(Arc::new(routes));

        let mut middleware = MiddlewareConfig::new();
        middleware.use_middleware(ErrorMiddleware::for_environment(environment));
        services.register(Arc::new(middleware));

        Ok(())
    }

    /// Builds an application in the testing environment.
    ///
    /// `arguments`, when given, replaces the environment's argument vector
    /// and so selects the command [`Application::run`] executes.
    fn make_application(&self, arguments: Option<Vec<String>>) -> AppResult<Application> {
        let mut environment = Environment::testing();
        if let Some(arguments) = arguments {
            environment.arguments = arguments;
        }

        let mut config = self.configuration()?;
        let mut services = self.services()?;
        self.configure(&mut config, &mut environment, &mut services)?;

        let app = Application::new(config, environment, services)?;
        self.boot(&app)?;
        Ok(app)
    }

    /// Reverts all migrations, then migrates again.
    ///
    /// Each step runs on its own freshly made application and completes
    /// before the next starts. The migrate step is skipped if reverting fails.
    fn revert(&self) -> Result<(), RevertError> {
        let app = self
            .make_application(Some(command_line(&["revert", "--all", "-y"])))
            .map_err(RevertError::Revert)?;
        run_step(app, RevertError::Revert)?;

        let app = self
            .make_application(Some(command_line(&["migrate", "-y"])))
            .map_err(RevertError::Migrate)?;
        run_step(app, RevertError::Migrate)?;

        tracing::debug!("migrations reverted and re-applied");
        Ok(())
    }
}

/// Runs `app`'s command to completion, attributing failures and panics to
/// the step named by `step`.
fn run_step(app: Application, step: fn(AppError) -> RevertError) -> Result<(), RevertError> {
    match runtime::block_on(runtime::supervise(async move { app.run().await }, None)) {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) | Ok(Err(HarnessError::UnderlyingApplication(e))) => Err(step(e)),
        Ok(Err(e)) | Err(e) => Err(RevertError::Harness(e)),
    }
}

fn command_line(arguments: &[&str]) -> Vec<String> {
    std::iter::once(DEFAULT_EXECUTABLE)
        .chain(arguments.iter().copied())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_app::{BoxFuture, Commands, Json, Migration, MigrationLog, Migrations};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Defaults;
    impl Testable for Defaults {}

    #[test]
    fn test_defaults_register_router_and_middleware() {
        let app = Defaults.make_application(None).unwrap();
        assert_eq!(app.environment().name, "testing");
        assert!(app.responder().is_some());
        assert!(app.services().contains::<Commands>());
        assert_eq!(
            app.make::<MiddlewareConfig>().unwrap().names(),
            vec!["error"]
        );
    }

    #[test]
    fn test_arguments_override() {
        let args = command_line(&["routes"]);
        let app = Defaults.make_application(Some(args.clone())).unwrap();
        assert_eq!(app.environment().arguments, args);
    }

    struct FailingBoot;
    impl Testable for FailingBoot {
        fn boot(&self, _app: &Application) -> AppResult<()> {
            Err(AppError::internal("boot failed"))
        }
    }

    #[test]
    fn test_boot_failure_propagates() {
        let err = FailingBoot.make_application(None).unwrap_err();
        assert_eq!(err.to_string(), "boot failed");
    }

    struct WithRoutes;
    impl Testable for WithRoutes {
        fn routes(&self, routes: &mut Routes) -> AppResult<()> {
            routes.get("/", |_req| async { Ok(Json(json!({"ok": true}))) });
            Ok(())
        }
    }

    #[test]
    fn test_routes_registered() {
        let app = WithRoutes.make_application(None).unwrap();
        assert_eq!(app.make::<Routes>().unwrap().route_count(), 1);
    }

    #[test]
    fn test_revert_without_migrations() {
        Defaults.revert().unwrap();
    }

    struct NoCommands;
    impl Testable for NoCommands {
        fn services(&self) -> AppResult<Services> {
            Ok(Services::new())
        }
    }

    #[test]
    fn test_revert_failure_reports_first_step() {
        let err = NoCommands.revert().unwrap_err();
        assert!(matches!(
            err,
            RevertError::Revert(AppError::ServiceNotRegistered { .. })
        ));
    }

    /// Panics in `step` once armed.
    struct Exploding {
        step: &'static str,
        armed: Arc<AtomicBool>,
    }

    impl Exploding {
        fn check(&self, step: &str) {
            if self.step == step && self.armed.load(Ordering::SeqCst) {
                panic!("{step} exploded");
            }
        }
    }

    impl Migration for Exploding {
        fn prepare<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
            Box::pin(async move {
                self.check("prepare");
                Ok(())
            })
        }

        fn revert<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
            Box::pin(async move {
                self.check("revert");
                Ok(())
            })
        }
    }

    struct ExplodingApp {
        step: &'static str,
        log: Arc<MigrationLog>,
        armed: Arc<AtomicBool>,
    }

    impl ExplodingApp {
        /// Migrates once, then arms the migration.
        fn migrated(step: &'static str) -> Self {
            let harness = Self {
                step,
                log: Arc::new(MigrationLog::new()),
                armed: Arc::new(AtomicBool::new(false)),
            };
            let app = harness
                .make_application(Some(command_line(&["migrate", "-y"])))
                .unwrap();
            runtime::block_on(async move { app.run().await })
                .unwrap()
                .unwrap();
            harness.armed.store(true, Ordering::SeqCst);
            harness
        }
    }

    impl Testable for ExplodingApp {
        fn services(&self) -> AppResult<Services> {
            let mut migrations = Migrations::with_log(Arc::clone(&self.log));
            migrations.add(Exploding {
                step: self.step,
                armed: Arc::clone(&self.armed),
            });

            let mut services = Services::default_services();
            services.register(Arc::new(migrations));
            Ok(services)
        }
    }

    #[test]
    fn test_revert_panic_reported_as_revert_step() {
        let err = ExplodingApp::migrated("revert").revert().unwrap_err();
        match err {
            RevertError::Revert(source) => {
                assert!(source.to_string().contains("revert exploded"), "{source}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_migrate_panic_reported_as_migrate_step() {
        let err = ExplodingApp::migrated("prepare").revert().unwrap_err();
        match err {
            RevertError::Migrate(source) => {
                assert!(source.to_string().contains("prepare exploded"), "{source}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
