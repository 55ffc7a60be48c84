//! Stackform CLI
//!
//! Runs one convergence transition per invocation against a Formance stack.
//! Documents are read from YAML or JSON files; the result is printed to
//! stdout as JSON `{ "state": ..., "diagnostics": [...] }`. Logs go to
//! stderr.

mod commands;
mod document;
mod logging;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use stackform_core::{CredentialDefaults, StackformConfig};
use stackform_runtime::ResourceKind;

#[derive(Parser, Debug)]
#[command(name = "stackform", version, about = "Converge Formance stack resources")]
struct Cli {
    /// Path to the configuration file.
    #[arg(
        long,
        short,
        global = true,
        env = "STACKFORM_CONFIG",
        default_value = "stackform.yaml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a resource from a desired document.
    Create {
        #[command(flatten)]
        kind: KindArg,

        /// Desired configuration (YAML or JSON).
        #[arg(long)]
        desired: PathBuf,
    },

    /// Refresh a stored state from the stack.
    Read {
        #[command(flatten)]
        kind: KindArg,

        /// Stored state (YAML or JSON).
        #[arg(long)]
        state: PathBuf,
    },

    /// Converge a stored state to a desired document.
    Update {
        #[command(flatten)]
        kind: KindArg,

        #[arg(long)]
        state: PathBuf,

        #[arg(long)]
        desired: PathBuf,
    },

    /// Delete the resource a stored state describes.
    Delete {
        #[command(flatten)]
        kind: KindArg,

        #[arg(long)]
        state: PathBuf,
    },

    /// Build a state from an existing remote object.
    Import {
        #[command(flatten)]
        kind: KindArg,

        /// Remote identifier.
        #[arg(long)]
        id: String,
    },

    /// Compare a stored state with a desired document, offline.
    Plan {
        #[command(flatten)]
        kind: KindArg,

        /// Stored state; omitted for a resource that does not exist yet.
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long)]
        desired: PathBuf,
    },

    /// Check the provider configuration and, optionally, a desired document.
    Validate {
        #[arg(long, requires = "desired")]
        kind: Option<ResourceKind>,

        #[arg(long, requires = "kind")]
        desired: Option<PathBuf>,
    },

    /// List stack modules with their version and health.
    Modules {
        /// Wait for `stack.expected_modules` to report healthy first.
        #[arg(long, default_value_t = false)]
        wait: bool,
    },

    /// Print version information.
    Version,
}

#[derive(Args, Debug)]
struct KindArg {
    /// Resource kind, e.g. `ledger` or `payments_pool`.
    #[arg(long)]
    kind: ResourceKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.logging)?;
    let defaults = CredentialDefaults::from_env();

    let report = match cli.cmd {
        Command::Create { kind, desired } => {
            commands::transition::create(&config, defaults, kind.kind, &desired).await?
        }
        Command::Read { kind, state } => {
            commands::transition::read(&config, defaults, kind.kind, &state).await?
        }
        Command::Update {
            kind,
            state,
            desired,
        } => commands::transition::update(&config, defaults, kind.kind, &state, &desired).await?,
        Command::Delete { kind, state } => {
            commands::transition::delete(&config, defaults, kind.kind, &state).await?
        }
        Command::Import { kind, id } => {
            commands::transition::import(&config, defaults, kind.kind, &id).await?
        }
        Command::Plan {
            kind,
            state,
            desired,
        } => commands::transition::plan(&config, kind.kind, state.as_deref(), &desired)?,
        Command::Validate { kind, desired } => {
            commands::validate::run(&config, defaults, kind.zip(desired))?
        }
        Command::Modules { wait } => commands::modules::run(&config, defaults, wait).await?,
        Command::Version => {
            commands::version::run();
            return Ok(ExitCode::SUCCESS);
        }
    };

    report.print()?;
    Ok(report.exit_code())
}

/// A missing default file means "all defaults"; an explicit path must exist.
fn load_config(path: &std::path::Path) -> anyhow::Result<StackformConfig> {
    use anyhow::Context;

    if !path.exists() && path == std::path::Path::new("stackform.yaml") {
        return Ok(StackformConfig::default());
    }
    StackformConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
