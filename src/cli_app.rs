//! Top-level CLI definition and dispatch.

#![allow(missing_docs)]

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use crate::core::config::{Config, ConfigOverrides, DEFAULT_CONFIG_FILE};
use crate::core::errors::Result;
use crate::daemon;
use crate::escalation::{ActionStatus, EscalationAction, RecoveryScripts};
use crate::logger::ActivityLogger;

/// Heartbeat watchdog — runs recovery scripts when remote agents stop checking in.
#[derive(Parser, Debug)]
#[command(name = "watchdog", version, about)]
pub struct Cli {
    /// Configuration file (TOML). Defaults to /etc/watchdog.toml when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for heartbeats and escalate after consecutive misses.
    Server(ServerArgs),
    /// Send heartbeats to a server at a fixed interval.
    Client(ClientArgs),
    /// List (or run once) the recovery scripts the server would execute.
    Scripts(ScriptsArgs),
    /// Show the effective configuration with the key redacted.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Overrides shared by the long-running modes.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Pre-shared key (mandatory, here or in the config file).
    #[arg(long)]
    pub key: Option<String>,
    /// TCP port (default 4848).
    #[arg(long)]
    pub port: Option<u16>,
    /// Heartbeat timeout / interval in seconds (default 600).
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// Activity log file (default /var/log/watchdog.log).
    #[arg(long, value_name = "PATH")]
    pub logs: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Address to listen on (default 0.0.0.0).
    #[arg(long)]
    pub bind: Option<IpAddr>,
    /// Consecutive misses before recovery scripts run (default 3).
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Recovery script directory (default /etc/watchdog.d/).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Server host to send heartbeats to.
    #[arg(long)]
    pub remote: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScriptsArgs {
    /// Recovery script directory (default /etc/watchdog.d/).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
    /// Run the scripts once instead of listing them.
    #[arg(long)]
    pub run: bool,
    /// Emit JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Emit JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

impl CommonArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            timeout_secs: self.timeout,
            key: self.key.clone(),
            log_file: self.logs.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        match &self.command {
            Command::Server(args) => ConfigOverrides {
                bind: args.bind,
                attempts: args.attempts,
                script_dir: args.dir.clone(),
                ..args.common.overrides()
            },
            Command::Client(args) => ConfigOverrides {
                remote: args.remote.clone(),
                ..args.common.overrides()
            },
            Command::Scripts(args) => ConfigOverrides {
                script_dir: args.dir.clone(),
                ..ConfigOverrides::default()
            },
            Command::Config(_) | Command::Completions { .. } => ConfigOverrides::default(),
        }
    }

    /// File configuration merged with command-line overrides.
    pub fn effective_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path, true)?,
            None => Config::load(std::path::Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        config.apply_overrides(&self.overrides());
        Ok(config)
    }
}

/// Dispatch CLI commands.
///
/// # Errors
/// Returns an error if configuration is invalid or a startup resource
/// (listener, log file) cannot be acquired.
pub fn run(cli: &Cli) -> Result<()> {
    if let Command::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "watchdog", &mut io::stdout());
        return Ok(());
    }

    let config = cli.effective_config()?;
    match &cli.command {
        Command::Server(_) => {
            config.server_settings()?;
            let logger = ActivityLogger::open(&config.log_file)?;
            daemon::run_server(&config, logger)
        }
        Command::Client(_) => {
            config.client_settings()?;
            let logger = ActivityLogger::open(&config.log_file)?;
            daemon::run_client(&config, logger)
        }
        Command::Scripts(args) => run_scripts(&config, args),
        Command::Config(args) => {
            let shown = config.redacted();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", shown.to_toml_string()?);
            }
            Ok(())
        }
        Command::Completions { .. } => Ok(()),
    }
}

fn run_scripts(config: &Config, args: &ScriptsArgs) -> Result<()> {
    let scripts = RecoveryScripts::new(&config.script_dir, config.script_prefix.clone());

    if args.run {
        let report = scripts.run_escalation();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        for outcome in &report.outcomes {
            match &outcome.status {
                ActionStatus::Succeeded => println!("{} {}", "ok".green(), outcome.action),
                ActionStatus::Failed { error } => {
                    println!("{} {} ({error})", "failed".red(), outcome.action);
                }
            }
        }
        if let Some(error) = report.last_error.as_deref().filter(|_| report.ran == 0) {
            println!("{} {error}", "error".red());
        }
        println!("{} ran, {} failed", report.ran, report.failed);
        return Ok(());
    }

    let candidates = scripts.candidates()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }
    if candidates.is_empty() {
        println!(
            "no recovery scripts matching '{}*' in {}",
            config.script_prefix,
            scripts.dir().display()
        );
    }
    for action in &candidates {
        println!("{}  {}", action.name.bold(), action.path.display());
    }
    Ok(())
}
