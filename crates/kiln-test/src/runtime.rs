//! Blocking bridge over the async request pipeline.
//!
//! Dispatches run on a dedicated process-wide multi-thread runtime and the
//! caller parks on a channel until the result arrives. Because the caller
//! never enters that runtime, the bridge works from plain `#[test]`
//! functions and from inside `#[tokio::test]` alike.

use std::any::Any;
use std::future::Future;
use std::sync::mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use kiln_app::AppError;
use tokio::runtime::Runtime;
use tokio::task::JoinError;

use crate::error::{HarnessError, HarnessResult};

static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

/// The shared harness runtime, created on first use.
pub(crate) fn runtime() -> HarnessResult<&'static Runtime> {
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("kiln-test")
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| HarnessError::Runtime(e.clone()))
}

/// Runs `future` on the harness runtime and blocks until it completes.
pub(crate) fn block_on<F>(future: F) -> HarnessResult<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let runtime = runtime()?;
    let (tx, rx) = mpsc::channel();

    runtime.spawn(async move {
        let _ = tx.send(future.await);
    });

    rx.recv()
        .map_err(|_| HarnessError::Runtime("dispatch task ended without a result".to_string()))
}

/// Runs `future` as its own task on the current runtime, applying `timeout`.
///
/// On expiry the task is aborted. A panic inside the task is reported as an
/// application error instead of unwinding into the caller.
pub(crate) async fn supervise<F>(future: F, timeout: Option<Duration>) -> HarnessResult<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let task = tokio::spawn(future);
    let abort = task.abort_handle();

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                tracing::warn!(timeout = ?limit, "dispatch timed out");
                return Err(HarnessError::Timeout { timeout: limit });
            }
        },
        None => task.await,
    };

    joined.map_err(from_join_error)
}

fn from_join_error(err: JoinError) -> HarnessError {
    if err.is_panic() {
        let message = panic_message(err.into_panic());
        HarnessError::UnderlyingApplication(AppError::internal(format!(
            "task panicked: {message}"
        )))
    } else {
        HarnessError::UnderlyingApplication(AppError::internal("task was cancelled"))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
