//! warden - shutdown-safe asynchronous command host.
//!
//! Selects a registered command from the trailing arguments and drives it
//! through the lifecycle runner. The front-end here is deliberately thin:
//! argument parsing and command registration are glue; every shutdown
//! guarantee lives in `warden-runtime`.
//!
//! # Environment Variables
//!
//! - `WARDEN_LOG`: tracing filter (overrides `--debug`)
//! - `WARDEN_STATE_DIR`: state root override (default `~/.warden`)
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Clean completion, or interrupted with successful cleanup |
//! | 1 | Command fault (cleanup ran) or host failure |
//! | 2 | Unknown or missing command |

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use warden_command::{CommandEnvironment, CommandRegistry, OptionBag, OptionSpec};
use warden_runtime::{CommandRunner, RouterConfig, StateDir};

/// Shutdown-safe asynchronous command host.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// List registered commands and exit
    #[arg(long)]
    list: bool,

    /// Override the state directory root (also: WARDEN_STATE_DIR)
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Also intercept SIGHUP
    #[arg(long)]
    hangup: bool,

    /// Command to execute, followed by key=value options
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WARDEN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// State root priority: `--state-dir`, then `WARDEN_STATE_DIR`, then
/// `~/.warden`.
fn resolve_state_root(cli_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = cli_override {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("unable to resolve the home directory")?;
    Ok(home.join(".warden"))
}

fn resolve_environment(command_name: &str, state_root: PathBuf) -> Result<CommandEnvironment> {
    let current_work_dir =
        std::env::current_dir().context("unable to resolve the current directory")?;
    let project_work_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| current_work_dir.clone());

    let state = StateDir::persistent(state_root)?;
    let (system_work_dir, user_work_dir) = state.command_dirs(command_name)?;

    Ok(CommandEnvironment {
        command_name: command_name.to_string(),
        current_work_dir,
        project_work_dir,
        system_work_dir,
        user_work_dir,
    })
}

/// Builds the option bag: declared defaults first, then `key=value`
/// arguments on top. A bare `key` becomes `true`. Values parse as JSON
/// scalars, falling back to strings.
fn parse_option_bag(args: &[String], specs: &BTreeMap<String, OptionSpec>) -> OptionBag {
    let mut bag = OptionBag::new();

    for (name, spec) in specs {
        if let Some(default) = &spec.default {
            bag.insert(name.clone(), default.clone());
        }
    }

    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                bag.insert(key.to_string(), parse_scalar(value));
            }
            None => {
                bag.insert(arg.clone(), Value::Bool(true));
            }
        }
    }

    bag
}

fn parse_scalar(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut registry = CommandRegistry::new();
    commands::register_builtins(&mut registry);

    if args.list {
        for (name, description) in registry.listing() {
            println!("{name:<12} {description}");
        }
        return Ok(());
    }

    let Some(name) = args.command.first().cloned() else {
        eprintln!("No command given. Use --list to see available commands.");
        std::process::exit(2);
    };

    let Some((metadata, command)) = registry.take(&name) else {
        eprintln!("Command '{name}' not found!");
        std::process::exit(2);
    };

    let options = parse_option_bag(&args.command[1..], &command.options());
    let environment = resolve_environment(&name, resolve_state_root(args.state_dir)?)?;

    let config = RouterConfig {
        hangup: args.hangup,
        ..RouterConfig::default()
    };
    let runner = CommandRunner::new(config);

    if let Err(err) = runner.execute(metadata, command, environment, options).await {
        // The fault path normally terminates through the exit gate before
        // execute returns; reaching here means the router failed to install.
        tracing::error!("{err}");
        std::process::exit(1);
    }

    Ok(())
}
