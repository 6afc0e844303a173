//! Binary provisioning for agentrun.
//!
//! Fetches the agent executable over HTTP, streams it to disk and marks it
//! executable once the write completed. The transport sits behind the
//! [`Fetcher`] trait so provisioning can be tested without a network.

pub mod error;
pub mod http;
pub mod provisioner;

pub use error::ProvisionError;
pub use http::{FetchResponse, Fetcher, HttpFetcher, ResponseBody};
pub use provisioner::{ProvisionedBinary, Provisioner};
