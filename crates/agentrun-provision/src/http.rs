//! HTTP transport for fetching the agent binary.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProvisionError;

/// A response body read chunk by chunk.
#[async_trait]
pub trait ResponseBody: Send {
    /// Next chunk of the body, or `None` at the end.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ProvisionError>;
}

/// Status line plus streaming body of a GET.
pub struct FetchResponse {
    pub status: u16,
    pub body: Box<dyn ResponseBody>,
}

/// "GET url → status + byte stream" capability.
///
/// Implementations must not retry on their own; the provisioner decides what
/// a non-200 status means.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a single GET for `url`.
    async fn get(&self, url: &str) -> Result<FetchResponse, ProvisionError>;
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    inner: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, ProvisionError> {
        debug!(url = %url, "GET request");

        let response = self.inner.get(url).send().await?;
        let status = response.status().as_u16();
        debug!(url = %url, status = status, "GET response");

        Ok(FetchResponse {
            status,
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ProvisionError> {
        Ok(self.0.chunk().await?.map(|bytes| bytes.to_vec()))
    }
}
