//! Administrative commands.
//!
//! An application runs exactly one command per [`Application::run`]. The
//! command is selected by the second element of the environment's argument
//! vector (`["kiln", "migrate", "-y"]`); when there is none, the configured
//! default command runs instead.
//!
//! The built-in commands are:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `routes` | lists registered routes |
//! | `migrate -y` | prepares pending migrations as a new batch |
//! | `revert -y` | reverts the newest batch |
//! | `revert --all -y` | reverts every applied migration |

use std::fmt;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches};
use indexmap::IndexMap;

use crate::application::Application;
use crate::error::{AppError, AppResult};
use crate::middleware::BoxFuture;
use crate::migration::Migrations;
use crate::routing::Routes;

/// Name of the root command in usage output.
const ROOT_COMMAND: &str = "kiln";

/// Everything a running command can see.
#[derive(Debug)]
pub struct CommandContext {
    /// The application running the command.
    pub app: Application,
    /// Parsed arguments of the command.
    pub matches: ArgMatches,
}

impl CommandContext {
    /// Returns whether a boolean flag was set. Unknown flags read as unset.
    #[must_use]
    pub fn flag(&self, id: &str) -> bool {
        matches!(self.matches.try_get_one::<bool>(id), Ok(Some(true)))
    }
}

/// An administrative command.
pub trait Command: Send + Sync + 'static {
    /// Name used to select the command.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn about(&self) -> &'static str;

    /// Adds the command's arguments.
    fn configure(&self, command: clap::Command) -> clap::Command {
        command
    }

    /// Runs the command to completion.
    fn run(&self, ctx: CommandContext) -> BoxFuture<'_, AppResult<()>>;
}

/// Registry of available commands, registered as a service.
#[derive(Clone, Default)]
pub struct Commands {
    commands: IndexMap<&'static str, Arc<dyn Command>>,
}

impl Commands {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in commands.
    #[must_use]
    pub fn default_commands() -> Self {
        let mut commands = Self::new();
        commands
            .register(RoutesCommand)
            .register(MigrateCommand)
            .register(RevertCommand);
        commands
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register<C: Command>(&mut self, command: C) -> &mut Self {
        self.commands.insert(command.name(), Arc::new(command));
        self
    }

    /// Looks up a command by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// Command names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Selects a command from an argument vector and parses its arguments.
    ///
    /// The first argument is the executable name. When no command name
    /// follows it, `default` is used.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Command` for unknown commands and malformed
    /// arguments.
    ///
    /// # Example
    ///
    /// ```
    /// use kiln_app::Commands;
    ///
    /// let commands = Commands::default_commands();
    /// let (command, matches) = commands
    ///     .parse(&["kiln".to_string(), "revert".into(), "--all".into(), "-y".into()], "routes")
    ///     .unwrap();
    ///
    /// assert_eq!(command.name(), "revert");
    /// assert!(matches.get_flag("all"));
    /// ```
    pub fn parse(
        &self,
        arguments: &[String],
        default: &str,
    ) -> AppResult<(Arc<dyn Command>, ArgMatches)> {
        let mut argv: Vec<String> = arguments.to_vec();
        if argv.is_empty() {
            argv.push(ROOT_COMMAND.to_string());
        }
        if argv.len() < 2 {
            argv.push(default.to_string());
        }

        let mut root = clap::Command::new(ROOT_COMMAND)
            .bin_name(argv[0].clone())
            .subcommand_required(true)
            .disable_help_subcommand(true);
        for command in self.commands.values() {
            root = root.subcommand(
                command.configure(clap::Command::new(command.name()).about(command.about())),
            );
        }

        let mut matches = root.try_get_matches_from(argv)?;
        let (name, sub_matches) = matches
            .remove_subcommand()
            .ok_or_else(|| AppError::command("no command given"))?;
        let command = self
            .get(&name)
            .ok_or_else(|| AppError::command(format!("unknown command `{name}`")))?;

        Ok((command, sub_matches))
    }
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("commands", &self.names())
            .finish()
    }
}

fn confirm_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .action(ArgAction::SetTrue)
        .help("Confirm without prompting")
}

fn require_confirmation(ctx: &CommandContext, command: &str) -> AppResult<()> {
    if ctx.flag("yes") {
        Ok(())
    } else {
        Err(AppError::command(format!(
            "`{command}` changes application state; pass -y to confirm"
        )))
    }
}

/// Lists the registered routes.
///
/// The listing is the command's output, so it is printed to stdout, one
/// `METHOD path` line per route. The run itself is recorded through
/// `tracing` like the other commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutesCommand;

impl Command for RoutesCommand {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn about(&self) -> &'static str {
        "Displays all registered routes"
    }

    fn run(&self, ctx: CommandContext) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            let Some(routes) = ctx.app.services().resolve::<Routes>() else {
                println!("no routes registered");
                tracing::info!(route_count = 0, "listed routes");
                return Ok(());
            };

            for (method, path) in routes.descriptions() {
                println!("{method:<7} {path}");
            }
            tracing::info!(route_count = routes.route_count(), "listed routes");
            Ok(())
        })
    }
}

/// Prepares pending migrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateCommand;

impl Command for MigrateCommand {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn about(&self) -> &'static str {
        "Prepares all pending migrations"
    }

    fn configure(&self, command: clap::Command) -> clap::Command {
        command.arg(confirm_arg())
    }

    fn run(&self, ctx: CommandContext) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            require_confirmation(&ctx, self.name())?;

            let services = ctx.app.services();
            let migrations = services.resolve_required::<Migrations>()?;
            let prepared = migrations.prepare_pending(services).await?;

            tracing::info!(
                prepared = prepared.len(),
                batch = migrations.log().last_batch(),
                "migrations complete"
            );
            Ok(())
        })
    }
}

/// Reverts migrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevertCommand;

impl Command for RevertCommand {
    fn name(&self) -> &'static str {
        "revert"
    }

    fn about(&self) -> &'static str {
        "Reverts the last batch of migrations, or all of them with --all"
    }

    fn configure(&self, command: clap::Command) -> clap::Command {
        command
            .arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Revert every applied migration"),
            )
            .arg(confirm_arg())
    }

    fn run(&self, ctx: CommandContext) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            require_confirmation(&ctx, self.name())?;

            let services = ctx.app.services();
            let migrations = services.resolve_required::<Migrations>()?;
            let reverted = if ctx.flag("all") {
                migrations.revert_all(services).await?
            } else {
                migrations.revert_batch(services).await?
            };

            tracing::info!(reverted = reverted.len(), "revert complete");
            Ok(())
        })
    }
}
