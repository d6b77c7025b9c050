use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

pub type HttpClient = reqwest::Client;

// Every outbound call shares the same client and the same fixed timeout; a
// timed-out call is an ordinary failure, never retried.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for both remotes.
pub fn build_client() -> Result<HttpClient> {
    let client = reqwest::ClientBuilder::new()
        .timeout(CALL_TIMEOUT)
        .build()?;
    Ok(client)
}

/// API to an HTTP endpoint returning the data type `T`; how is the data
/// **extracted**?
///
/// Board writes don't fit this shape (every one is a POST addressed per row),
/// so they live on the `Monday` type as inherent methods.
#[async_trait]
pub trait Http<T>
where
    T: Debug + Send + Sync,
{
    /// How the data type `T` is fetched from some HTTP endpoint.
    async fn fetch(http_client: &HttpClient, url: &String) -> Result<T>;
}
