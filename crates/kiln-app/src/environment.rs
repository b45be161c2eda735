//! Execution environments.
//!
//! An [`Environment`] names the mode an application runs in and carries the
//! argument vector used to select an administrative command. The first
//! argument is the executable name; the second, if present, names the
//! command to run.

use std::fmt;

/// Executable name used when no arguments are supplied.
pub const DEFAULT_EXECUTABLE: &str = "kiln";

/// A named execution mode.
///
/// # Example
///
/// ```
/// use kiln_app::Environment;
///
/// let env = Environment::testing();
/// assert_eq!(env.name, "testing");
/// assert!(!env.is_release);
/// assert_eq!(env.arguments, vec!["kiln".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Environment name (e.g. "testing").
    pub name: String,

    /// Whether this is a release environment. Release environments hide
    /// internal error details from responses.
    pub is_release: bool,

    /// Argument vector used to select a command.
    pub arguments: Vec<String>,
}

impl Environment {
    /// Creates an environment with the default argument vector.
    pub fn new(name: impl Into<String>, is_release: bool) -> Self {
        Self {
            name: name.into(),
            is_release,
            arguments: vec![DEFAULT_EXECUTABLE.to_string()],
        }
    }

    /// The environment used by test harnesses.
    #[must_use]
    pub fn testing() -> Self {
        Self::new("testing", false)
    }

    /// The local development environment.
    #[must_use]
    pub fn development() -> Self {
        Self::new("development", false)
    }

    /// The production environment.
    #[must_use]
    pub fn production() -> Self {
        Self::new("production", true)
    }

    /// Replaces the argument vector.
    #[must_use]
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the executable name (the first argument).
    #[must_use]
    pub fn executable(&self) -> &str {
        self.arguments
            .first()
            .map_or(DEFAULT_EXECUTABLE, String::as_str)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
