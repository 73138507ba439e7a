use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::AppState;
use std::sync::Arc;
use std::time::Duration;

use crate::api::CfClient;
use crate::config::{
    RestageConfig, Target, TargetOverrides, DEFAULT_MIN_AGE_DAYS, DEFAULT_RESTART_TIMEOUT_SECS,
    DEFAULT_STAGE_TIMEOUT_SECS, DEFAULT_STATE, POLL_INTERVAL,
};
use crate::error::SweepError;
use crate::report::{ConsoleReporter, Reporter};
use crate::sweep::{Sweep, SweepSummary};

#[derive(Parser, Debug)]
#[command(name = "cf-restage-all", version)]
#[command(about = "Rebuild and restart every application in the targeted space")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restage applications within a particular space
    #[command(name = "restage-all")]
    RestageAll(RestageArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RestageArgs {
    /// Restage all applications in this state
    #[arg(short = 's', long = "state", default_value = DEFAULT_STATE,
          value_parser = ["started", "stopped"], ignore_case = true)]
    pub state: String,

    /// Restage all applications whose droplet is at least this many days old
    #[arg(short = 'a', long = "age", value_name = "DAYS", default_value_t = DEFAULT_MIN_AGE_DAYS)]
    pub age: u32,

    /// Build stage timeout in seconds
    #[arg(long = "stage-timeout", visible_aliases = ["stageTimeout", "st"], value_name = "SECS",
          default_value_t = DEFAULT_STAGE_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub stage_timeout: u64,

    /// App restart timeout in seconds
    #[arg(long = "restart-timeout", visible_aliases = ["restartTimeout", "rt"], value_name = "SECS",
          default_value_t = DEFAULT_RESTART_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub restart_timeout: u64,

    /// API endpoint; defaults to the cf CLI's current target
    #[arg(long, env = "CF_API")]
    pub api: Option<String>,

    /// Access token; defaults to the cf CLI's stored token
    #[arg(long, env = "CF_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Space guid; defaults to the cf CLI's targeted space
    #[arg(long = "space", env = "CF_SPACE_GUID")]
    pub space_guid: Option<String>,
}

impl RestageArgs {
    pub fn config(&self) -> RestageConfig {
        RestageConfig {
            state_filter: AppState::from(self.state.as_str()),
            min_age_days: self.age,
            stage_timeout: Duration::from_secs(self.stage_timeout),
            restart_timeout: Duration::from_secs(self.restart_timeout),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            api: self.api.clone(),
            token: self.token.clone(),
            space_guid: self.space_guid.clone(),
        }
    }
}

/// Reports how the sweep ended and returns the process exit code.
pub fn finish(result: Result<SweepSummary, SweepError>, reporter: &dyn Reporter) -> i32 {
    match result {
        Ok(summary) => {
            reporter.info(&summary.line());
            0
        }
        Err(e) => {
            reporter.error(&format!("Fatal Error: {}", e));
            1
        }
    }
}

pub async fn restage_all(args: &RestageArgs, reporter: &dyn Reporter) -> Result<i32> {
    let target = Target::resolve(args.overrides()).context("could not determine the target")?;
    let client = CfClient::new(&target)?;
    let config = args.config();

    let result = Sweep::new(Arc::new(client), &config, reporter).run().await;
    Ok(finish(result, reporter))
}

pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::RestageAll(args) => restage_all(&args, &ConsoleReporter).await,
    }
}
