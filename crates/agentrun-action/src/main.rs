//! agentrun host binary

use std::process::ExitCode;
use std::sync::Arc;

use agentrun_provision::HttpFetcher;
use agentrun_sdk::ConsoleObserver;
use clap::Parser;
use tracing::{error, info};

mod config;
mod host;
mod inputs;
mod logging;
mod runner;
mod settings;

use config::{Args, Config};
use host::{HostEnvironment, WorkflowEnvironment};
use runner::{RunError, Runner};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.log_level.as_deref());

    let mut host = WorkflowEnvironment::from_env();

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            let message = format!(
                "working directory {} is not usable: {}",
                args.working_dir.display(),
                e
            );
            error!(error = %e, "Invalid working directory");
            host.set_failed(&message);
            return ExitCode::FAILURE;
        }
    };

    info!(
        working_dir = %config.working_dir.display(),
        binary_url = %config.binary_url,
        timeout_secs = config.timeout.map(|t| t.as_secs()),
        "Starting agentrun"
    );

    let runner = Runner::new(config, HttpFetcher::new(), Arc::new(ConsoleObserver));
    match runner.run(&mut host).await {
        Ok(outcome) => match runner.failure_message(&outcome) {
            None => {
                info!("Agent task succeeded");
                ExitCode::SUCCESS
            }
            Some(message) => {
                error!(conclusion = outcome.conclusion(), "Agent task failed");
                host.set_failed(&message);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            let input = match &e {
                RunError::Configuration(config) => config.input_name(),
                _ => None,
            };
            error!(error = %e, input = input, "Agent run aborted");
            host.set_failed(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
