//! Log output for test runs.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber.
///
/// Output goes through the test harness's capture, so it shows only for
/// failing tests. The filter comes from `RUST_LOG` and defaults to `warn`.
/// Safe to call from every test; only the first call has an effect, and an
/// already installed global subscriber is left in place.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
