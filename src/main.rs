use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use jaas_runner::config::{
    load_config, ResolvedConfig, RunInputs, RunInputsBuilder, StepSettings,
};
use jaas_runner::env::parse_assignment;
use jaas_runner::lifecycle::{BuildLog, CancelToken, ConsoleLog, LifecycleController};
use jaas_runner::validation::{validate_resolved, validate_settings, FieldIssue};
use jaas_runner::{JaasClient, RunError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "jaas-runner",
    version,
    about = "Start a Jagger test execution through JaaS and wait for it to finish",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    step: StepArgs,

    /// Directory or file containing jaas.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Select a profile from jaas.json
    #[arg(short = 'P', long)]
    profile: Option<String>,

    /// Vars file (dotenv format) merged into the run variables
    #[arg(short, long)]
    env: Option<PathBuf>,

    /// Run variable, usable as $NAME or ${NAME} in any setting
    #[arg(short = 'D', long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Seconds to wait between status polls
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    poll_interval: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Step settings given on the command line. They override jaas.json.
#[derive(Args, Debug, Default)]
struct StepArgs {
    /// JaaS endpoint, e.g. http://jaas.local:8088/jaas
    #[arg(long)]
    endpoint: Option<String>,

    /// URL of the test project repository
    #[arg(long)]
    test_project_url: Option<String>,

    /// Environment the test runs against
    #[arg(long)]
    env_id: Option<String>,

    /// Load scenario to execute
    #[arg(long)]
    load_scenario_id: Option<String>,

    /// Seconds JaaS waits for the execution to start
    #[arg(long, value_name = "SECS")]
    start_timeout: Option<String>,
}

impl StepArgs {
    fn to_settings(&self) -> StepSettings {
        StepSettings {
            jaas_endpoint: self.endpoint.clone(),
            test_project_url: self.test_project_url.clone(),
            env_id: self.env_id.clone(),
            load_scenario_id: self.load_scenario_id.clone(),
            execution_start_timeout: self.start_timeout.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the step settings without contacting JaaS
    Validate {
        /// Substitute variables first and check the final values
        #[arg(long)]
        resolved: bool,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    parse_assignment(raw).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let config_target = cli.config.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&config_target).context("loading configuration")?;
    if let Some(loaded) = &config {
        debug!(path = %loaded.path.display(), "loaded configuration");
    }

    let inputs = RunInputsBuilder::new(config)
        .profile(cli.profile.clone())
        .vars_file(cli.env.clone())
        .overrides(cli.step.to_settings())
        .variables(cli.vars.clone())
        .build()?;

    if let Some(Commands::Validate { resolved }) = &cli.command {
        validate(&inputs, *resolved)?;
        return Ok(ExitCode::SUCCESS);
    }

    run(&inputs, Duration::from_secs(cli.poll_interval)).await
}

/// Configuration problems surface as errors. Once the controller starts, the
/// outcome is reported on the build log only and turned into the exit code.
async fn run(inputs: &RunInputs, poll_interval: Duration) -> Result<ExitCode> {
    let resolved = ResolvedConfig::resolve(&inputs.settings, &inputs.context());
    validate_resolved(&resolved).map_err(RunError::from)?;

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let controller = LifecycleController::new(JaasClient::new())
        .with_poll_interval(poll_interval)
        .with_cancel_token(cancel);

    let mut log = ConsoleLog::stdout();
    match controller.run(&resolved, &mut log).await {
        Ok(outcome) => {
            info!(
                execution_id = outcome.execution_id,
                status = %outcome.status,
                "run finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            debug!(execution_id = ?err.execution_id(), "run aborted");
            log.failure(&err.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn validate(inputs: &RunInputs, resolved: bool) -> Result<()> {
    let issues: Vec<FieldIssue> = if resolved {
        let config = ResolvedConfig::resolve(&inputs.settings, &inputs.context());
        validate_resolved(&config).err().into_iter().collect()
    } else {
        validate_settings(&inputs.settings)
    };

    if issues.is_empty() {
        println!("{} configuration is valid", "ok".green().bold());
        return Ok(());
    }

    for issue in &issues {
        println!("{} {}", "error".red().bold(), issue);
    }
    bail!("{} configuration problem(s) found", issues.len());
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
