use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// Fixed endpoint path on the relay service.
pub const RELAY_PATH: &str = "/msg";

/// Body posted to the relay service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayRequest {
    pub message: String,
}

impl RelayRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parsed reply from the relay service.
///
/// Extraction is permissive: no schema is enforced on `raw`.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayResponse {
    pub raw: Value,
    pub result: Option<String>,
}

impl RelayResponse {
    pub fn from_value(raw: Value) -> Self {
        let result = match raw.get("result") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self { raw, result }
    }

    /// Result text; missing key yields an empty string.
    pub fn text(&self) -> &str {
        self.result.as_deref().unwrap_or("")
    }
}

/// Port for the remote processing service.
///
/// One attempt per call; no retry.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn relay(&self, req: RelayRequest) -> Result<RelayResponse>;
}
