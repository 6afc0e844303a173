//! agentrun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Child processes
//! - Network transports
//! - Runtime specifics
//!
//! Everything here can be exercised with synthetic inputs, which is how the
//! outcome classifier and the result extractor are tested.

pub mod error;
pub mod ids;
pub mod outcome;
pub mod result;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::ConfigurationError;
pub use ids::RunId;
pub use outcome::{classify, Classification, Outcome};
pub use result::{ResultExtractor, ResultMessage, ResultRecord};
pub use status::{InvalidTransition, ProcessExit, ProcessState, SubtypePolicy};
pub use task::{RunSummary, TaskRequest};
