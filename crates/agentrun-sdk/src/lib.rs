//! Agent process SDK for agentrun
//!
//! This crate launches the agent executable, drains its stdout and stderr
//! concurrently into a durable run log, and folds stdout into the last JSON
//! result record for classification.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentrun_core::{classify, SubtypePolicy, TaskRequest};
//! use agentrun_sdk::{AgentEnvironment, AgentExecutor, ConsoleObserver, LogSink};
//!
//! async fn run_agent() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = AgentExecutor::new("./.agentrun/bin/agent")
//!         .with_environment(AgentEnvironment::new("user", "machine", "default"));
//!
//!     let request = TaskRequest::new("What is 2 + 2?", ".");
//!     let sink = LogSink::open("./.agentrun/output.log").await?;
//!     let report = executor.execute(&request, sink, Arc::new(ConsoleObserver)).await?;
//!
//!     let verdict = classify(report.exit, report.output.record.as_ref(), SubtypePolicy::Strict);
//!     println!("Outcome: {:?}", verdict.outcome);
//!     Ok(())
//! }
//! ```

mod client;
mod environment;
mod error;
mod executor;
mod log_sink;
mod protocol;
mod supervisor;

// Re-export main types
pub use client::{ChannelObserver, ConsoleObserver, StreamChunk, StreamKind};
pub use environment::{
    AgentEnvironment, ENV_API_KEY, ENV_AUX_TOKEN, ENV_MACHINE_ID, ENV_MODEL, ENV_USER_EMAIL,
    ENV_USER_ID,
};
pub use error::SdkError;
pub use executor::{AgentExecutor, ExecutionReport, RunningAgent, OUTPUT_FORMAT};
pub use log_sink::LogSink;
pub use protocol::{LineBuffer, StreamObserver};
pub use supervisor::{
    StreamStats, StreamSupervisor, SupervisedOutput, SupervisorHandle, STDERR_PREFIX,
};
