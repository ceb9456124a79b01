//! Best-effort status side channel.
//!
//! When a transfer starts, the asset record on the server is told where the
//! object will land and what it is. Failures are logged and never block the
//! transfer.

use async_trait::async_trait;
use serde::Serialize;

use crate::curl_json;

/// Asset status flag sent when a transfer starts.
pub const STATUS_UPLOADING: &str = "uploading";

/// Payload for the asset record update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub storage_path: String,
    pub size: u64,
    pub mime_type: String,
    pub status: String,
}

#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn transfer_started(&self, update: &StatusUpdate) -> anyhow::Result<()>;
}

/// Reporter that does nothing (no status endpoint configured).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusReporter;

#[async_trait]
impl StatusReporter for NoopStatusReporter {
    async fn transfer_started(&self, _update: &StatusUpdate) -> anyhow::Result<()> {
        Ok(())
    }
}

/// PATCHes the update as JSON to a configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpStatusReporter {
    endpoint: url::Url,
    auth_token: Option<String>,
}

impl HttpStatusReporter {
    pub fn new(endpoint: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("invalid status endpoint: {}", e))?;
        Ok(Self {
            endpoint,
            auth_token,
        })
    }
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
    async fn transfer_started(&self, update: &StatusUpdate) -> anyhow::Result<()> {
        let body = serde_json::to_vec(update)?;
        let endpoint = self.endpoint.clone();
        let token = self.auth_token.clone();
        let response = tokio::task::spawn_blocking(move || {
            curl_json::send_json("PATCH", endpoint.as_str(), token.as_deref(), &body)
        })
        .await
        .map_err(|e| anyhow::anyhow!("status task join: {}", e))??;
        if !response.is_success() {
            anyhow::bail!("status endpoint returned HTTP {}", response.code);
        }
        Ok(())
    }
}
