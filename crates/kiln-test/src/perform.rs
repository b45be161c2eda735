//! Running fallible test bodies.

/// Runs `body` and turns any error into a panic that prints the full cause
/// chain.
///
/// Works with any test framework: the panic is the failure report.
///
/// # Example
///
/// ```
/// use kiln_test::perform;
///
/// perform(|| {
///     let n: u32 = "42".parse()?;
///     assert_eq!(n, 42);
///     Ok(())
/// });
/// ```
///
/// # Panics
///
/// Panics if `body` returns an error.
#[track_caller]
pub fn perform<F>(body: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    if let Err(err) = body() {
        panic!("test body failed: {err:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use anyhow::Context;

    #[test]
    fn test_ok_body() {
        perform(|| Ok(()));
    }

    #[test]
    #[should_panic(expected = "decoding greeting")]
    fn test_error_context_in_panic() {
        perform(|| {
            Err::<(), _>(HarnessError::Configuration("missing".to_string())).context("decoding greeting")?;
            Ok(())
        });
    }

    #[test]
    #[should_panic(expected = "application is not configured to respond: missing")]
    fn test_cause_chain_in_panic() {
        perform(|| {
            Err::<(), _>(HarnessError::Configuration("missing".to_string())).context("decoding greeting")?;
            Ok(())
        });
    }
}
