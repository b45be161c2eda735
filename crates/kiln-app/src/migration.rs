//! Migrations and the log of which ones have been applied.
//!
//! Migrations are prepared in registration order. Each `migrate` run
//! records the migrations it prepared as one batch; reverting undoes the
//! newest batch, or every batch, in reverse order of application.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AppError, AppResult};
use crate::middleware::BoxFuture;
use crate::services::Services;

/// A reversible change to application state.
///
/// # Example
///
/// ```
/// use kiln_app::{AppResult, BoxFuture, Migration, Services};
///
/// struct CreateTodos;
///
/// impl Migration for CreateTodos {
///     fn name(&self) -> &str {
///         "CreateTodos"
///     }
///
///     fn prepare<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
///         Box::pin(async { Ok(()) })
///     }
///
///     fn revert<'a>(&'a self, _services: &'a Services) -> BoxFuture<'a, AppResult<()>> {
///         Box::pin(async { Ok(()) })
///     }
/// }
/// ```
pub trait Migration: Send + Sync + 'static {
    /// Unique name recorded in the [`MigrationLog`]. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Applies the migration.
    fn prepare<'a>(&'a self, services: &'a Services) -> BoxFuture<'a, AppResult<()>>;

    /// Undoes the migration.
    fn revert<'a>(&'a self, services: &'a Services) -> BoxFuture<'a, AppResult<()>>;
}

/// An applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// Batch the migration was applied in, starting at 1.
    pub batch: u32,
}

/// Records applied migrations in application order.
///
/// Shared through an `Arc` so that state survives across the fresh
/// applications a test builds.
#[derive(Debug, Default)]
pub struct MigrationLog {
    records: Mutex<Vec<MigrationRecord>>,
}

impl MigrationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of applied migrations, oldest first.
    #[must_use]
    pub fn applied(&self) -> Vec<MigrationRecord> {
        self.records.lock().clone()
    }

    /// Whether a migration with this name is applied.
    #[must_use]
    pub fn is_applied(&self, name: &str) -> bool {
        self.records.lock().iter().any(|r| r.name == name)
    }

    /// The newest batch number, or 0 if nothing is applied.
    #[must_use]
    pub fn last_batch(&self) -> u32 {
        self.records.lock().iter().map(|r| r.batch).max().unwrap_or(0)
    }

    fn record(&self, name: &str, batch: u32) {
        self.records.lock().push(MigrationRecord {
            name: name.to_string(),
            batch,
        });
    }

    fn remove(&self, name: &str) {
        self.records.lock().retain(|r| r.name != name);
    }

    /// Names to revert, newest first, optionally limited to one batch.
    fn revert_order(&self, batch: Option<u32>) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .rev()
            .filter(|r| batch.map_or(true, |b| r.batch == b))
            .map(|r| r.name.clone())
            .collect()
    }
}

/// Ordered migration registry, registered as a service.
#[derive(Clone, Default)]
pub struct Migrations {
    migrations: Vec<Arc<dyn Migration>>,
    log: Arc<MigrationLog>,
}

impl Migrations {
    /// Creates an empty registry with its own log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that records into `log`.
    #[must_use]
    pub fn with_log(log: Arc<MigrationLog>) -> Self {
        Self {
            migrations: Vec::new(),
            log,
        }
    }

    /// Appends a migration.
    pub fn add<M: Migration>(&mut self, migration: M) -> &mut Self {
        self.migrations.push(Arc::new(migration));
        self
    }

    /// The shared log.
    #[must_use]
    pub fn log(&self) -> &Arc<MigrationLog> {
        &self.log
    }

    /// Number of registered migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Returns `true` if no migrations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Prepares every migration not yet applied, as one new batch.
    ///
    /// Returns the names prepared. Stops at the first failure; migrations
    /// prepared before it stay recorded.
    pub async fn prepare_pending(&self, services: &Services) -> AppResult<Vec<String>> {
        let batch = self.log.last_batch() + 1;
        let mut prepared = Vec::new();

        for migration in &self.migrations {
            let name = migration.name();
            if self.log.is_applied(name) {
                continue;
            }

            tracing::info!(migration = name, batch, "preparing migration");
            migration
                .prepare(services)
                .await
                .map_err(|e| as_migration_error(name, e))?;
            self.log.record(name, batch);
            prepared.push(name.to_string());
        }

        Ok(prepared)
    }

    /// Reverts the newest batch. Returns the names reverted.
    pub async fn revert_batch(&self, services: &Services) -> AppResult<Vec<String>> {
        let batch = self.log.last_batch();
        if batch == 0 {
            return Ok(Vec::new());
        }
        self.revert_names(self.log.revert_order(Some(batch)), services)
            .await
    }

    /// Reverts every applied migration, newest first. Returns the names reverted.
    pub async fn revert_all(&self, services: &Services) -> AppResult<Vec<String>> {
        self.revert_names(self.log.revert_order(None), services)
            .await
    }

    async fn revert_names(
        &self,
        names: Vec<String>,
        services: &Services,
    ) -> AppResult<Vec<String>> {
        for name in &names {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.name() == name.as_str())
                .ok_or_else(|| AppError::migration(name.as_str(), "applied but not registered"))?;

            tracing::info!(migration = name.as_str(), "reverting migration");
            migration
                .revert(services)
                .await
                .map_err(|e| as_migration_error(name, e))?;
            self.log.remove(name);
        }

        Ok(names)
    }
}

fn as_migration_error(name: &str, err: AppError) -> AppError {
    match err {
        err @ AppError::Migration { .. } => err,
        other => AppError::migration(name, other.to_string()),
    }
}

impl fmt::Debug for Migrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.migrations.iter().map(|m| m.name()).collect();
        f.debug_struct("Migrations")
            .field("migrations", &names)
            .field("log", &self.log)
            .finish()
    }
}
