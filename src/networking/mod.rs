use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::util::strip_bom;

const USER_AGENT: &str = concat!("CrystalLauncher/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    /// Client for small documents: config overrides, feeds and status polls.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    /// Client for package downloads; only the connect phase is bounded.
    pub fn for_downloads() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default download client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    /// GET `url`, failing on transport errors and non-success statuses.
    pub async fn get(&self, url: &str) -> Result<Response, String> {
        debug!("GET {url}");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("{url} returned an error status: {e}"))
    }

    /// GET `url` and deserialize its JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| format!("failed to read response from {url}: {e}"))?;
        serde_json::from_slice(strip_bom(&bytes))
            .map_err(|e| format!("invalid JSON from {url}: {e}"))
    }
}

impl Default for NetworkClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubResponse, serve};

    #[tokio::test]
    async fn fetches_and_parses_json_documents() {
        let server = serve(vec![("/doc", StubResponse::json(r#"{"value": 3}"#))]).await;
        let value: serde_json::Value = NetworkClient::new()
            .get_json(&server.url("/doc"))
            .await
            .unwrap();
        assert_eq!(value["value"], 3);
    }

    #[tokio::test]
    async fn rejects_error_statuses() {
        let server = serve(vec![]).await;
        let result: Result<serde_json::Value, String> =
            NetworkClient::new().get_json(&server.url("/missing")).await;
        assert!(result.unwrap_err().contains("error status"));
    }

    #[tokio::test]
    async fn rejects_malformed_bodies() {
        let server = serve(vec![("/bad", StubResponse::json("{not json"))]).await;
        let result: Result<serde_json::Value, String> =
            NetworkClient::new().get_json(&server.url("/bad")).await;
        assert!(result.unwrap_err().contains("invalid JSON"));
    }
}
