//! Agora command line: validate a governance configuration or replay a
//! scripted session against a freshly deployed instance.

mod scenario;

use std::path::{Path, PathBuf};

use agora_governance::GovernanceConfig;
use agora_types::Address;
use agora_utils::{init_logging, LogFormat};
use anyhow::Context;
use clap::Parser;

use crate::scenario::{Script, Session};

#[derive(Parser)]
#[command(name = "agora", about = "Time-boxed proposal governance")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// Defaults to the config file's value.
    #[arg(long, global = true, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json". Defaults to the config file's value.
    #[arg(long, global = true, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Deploy one instance from a config file and replay a session script,
    /// printing events and step results as JSON lines.
    Run {
        /// Path to the governance TOML configuration.
        #[arg(long, env = "AGORA_CONFIG")]
        config: PathBuf,

        /// Path to the session script.
        #[arg(long)]
        script: PathBuf,

        /// Overrides the configured admin address.
        #[arg(long, env = "AGORA_ADMIN")]
        admin: Option<Address>,

        /// Overrides the configured initial funding.
        #[arg(long)]
        initial_funding: Option<u64>,

        /// Stop at the first failing step.
        #[arg(long)]
        fail_fast: bool,
    },
    /// Validate a configuration file and print the resulting voting rules.
    CheckConfig {
        /// Path to the governance TOML configuration.
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> anyhow::Result<GovernanceConfig> {
    GovernanceConfig::from_toml_file(path)
        .with_context(|| format!("loading config {}", path.display()))
}

fn start_logging(cli: &Cli, config: &GovernanceConfig) -> anyhow::Result<()> {
    let format_name = cli.log_format.as_deref().unwrap_or(&config.log_format);
    let format = LogFormat::parse(format_name)
        .with_context(|| format!("unknown log format {format_name:?}"))?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(format, level);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Run {
            config,
            script,
            admin,
            initial_funding,
            fail_fast,
        } => {
            let mut config = load_config(config)?;
            if let Some(admin) = admin {
                config.admin = Some(*admin);
            }
            if let Some(amount) = initial_funding {
                config.initial_funding = *amount;
            }
            start_logging(&cli, &config)?;
            config.validate()?;

            let script = Script::from_toml_file(script)?;
            let session = Session::deploy(&config, &script)?;
            let mut stdout = std::io::stdout().lock();
            let summary = session.replay(&script.steps, *fail_fast, &mut stdout)?;
            tracing::info!(
                steps = summary.steps,
                failures = summary.failures,
                treasury = %session.treasury_balance(),
                "session finished"
            );
        }
        Command::CheckConfig { config } => {
            let config = load_config(config)?;
            start_logging(&cli, &config)?;
            config.validate()?;
            let rules = config.voting_rules()?;
            let report = serde_json::json!({
                "variant": config.variant,
                "voting_rules": rules,
                "proposal_policy": config.proposal_policy(),
                "admin": config.admin,
                "initial_funding": config.initial_funding,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
