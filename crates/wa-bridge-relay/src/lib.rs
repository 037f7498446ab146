//! Relay adapter (remote processing API).
//!
//! Posts `{"message": ...}` to `{base}/msg` and extracts the `result` field.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};
use url::Url;

use wa_bridge_core::{
    errors::Error,
    ports::{RelayClient, RelayRequest, RelayResponse, RELAY_PATH},
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpRelayClient {
    endpoint: Url,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("relay http client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint_url(base_url)?,
            timeout,
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, req: &RelayRequest) -> Result<RelayResponse> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RelayStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect::<String>(),
            });
        }

        // Non-JSON bodies are kept as a string and carry no `result`.
        let body = resp.text().await.map_err(|e| self.map_err(e))?;
        let v = serde_json::from_str::<serde_json::Value>(&body)
            .unwrap_or(serde_json::Value::String(body));
        Ok(RelayResponse::from_value(v))
    }

    fn map_err(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::RelayTimeout(self.timeout)
        } else {
            Error::Relay(e.to_string())
        }
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn relay(&self, req: RelayRequest) -> Result<RelayResponse> {
        match self.post(&req).await {
            Ok(resp) => {
                info!(payload = %resp.raw, "relay response");
                info!("Response from API: {}", resp.text());
                Ok(resp)
            }
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "error sending message to relay");
                Err(e)
            }
        }
    }
}

/// Resolve the fixed endpoint path against `base`, keeping any path prefix.
fn endpoint_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(RELAY_PATH.trim_start_matches('/'))
        .map_err(|e| Error::Config(format!("invalid relay endpoint: {e}")))
}
