//! Service registry.
//!
//! Services are registered while an application is being configured and
//! resolved by type afterwards, from handlers, commands and migrations.
//!
//! # Example
//!
//! ```rust
//! use kiln_app::Services;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut services = Services::new();
//! services.register(Arc::new(Database { url: "memory://".to_string() }));
//!
//! let db: Arc<Database> = services.resolve().unwrap();
//! assert_eq!(db.url, "memory://");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::Commands;
use crate::error::{AppError, AppResult};
use crate::migration::Migrations;

/// A type-keyed registry of shared services.
///
/// Registering a second service of the same type replaces the first.
#[derive(Default, Clone)]
pub struct Services {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Creates the framework's default registry: the built-in commands and
    /// an empty migration list.
    #[must_use]
    pub fn default_services() -> Self {
        let mut services = Self::new();
        services.register(Arc::new(Commands::default_commands()));
        services.register(Arc::new(Migrations::new()));
        services
    }

    /// Registers a service, replacing any previous service of the same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    /// Resolves a service, returning `None` if it is not registered.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
    }

    /// Resolves a service or fails with [`AppError::ServiceNotRegistered`].
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> AppResult<Arc<T>> {
        self.resolve().ok_or_else(AppError::not_registered::<T>)
    }

    /// Checks whether a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("service_count", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_register_and_resolve() {
        let mut services = Services::new();
        services.register(Arc::new(Counter(1)));

        assert!(services.contains::<Counter>());
        assert_eq!(*services.resolve::<Counter>().unwrap(), Counter(1));
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let mut services = Services::new();
        services.register(Arc::new(Counter(1)));
        services.register(Arc::new(Counter(2)));

        assert_eq!(services.len(), 1);
        assert_eq!(*services.resolve::<Counter>().unwrap(), Counter(2));
    }

    #[test]
    fn test_resolve_required_missing() {
        let services = Services::new();
        let err = services.resolve_required::<Counter>().unwrap_err();
        assert!(matches!(err, AppError::ServiceNotRegistered { .. }));
        assert!(services.is_empty());
    }

    #[test]
    fn test_default_services() {
        let services = Services::default_services();
        assert!(services.contains::<Commands>());
        assert!(services.contains::<Migrations>());
    }

    #[test]
    fn test_clone_shares_instances() {
        let mut services = Services::new();
        services.register(Arc::new(Counter(3)));
        let cloned = services.clone();

        let a = services.resolve::<Counter>().unwrap();
        let b = cloned.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
