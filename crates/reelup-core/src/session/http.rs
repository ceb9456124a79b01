//! Session issuer backed by an HTTP endpoint (libcurl).

use async_trait::async_trait;

use crate::curl_json;
use crate::error::SessionError;

use super::{IssuedSession, SessionIssuer, SessionRequest};

/// POSTs `{org, bucket, fileName}` to a configured endpoint and parses
/// `{bucket, storage_path, temporary_credentials}` from the reply.
#[derive(Debug, Clone)]
pub struct HttpSessionIssuer {
    endpoint: Option<url::Url>,
    auth_token: Option<String>,
}

impl HttpSessionIssuer {
    /// `endpoint = None` yields an issuer that always fails with `NotConfigured`.
    pub fn new(endpoint: Option<&str>, auth_token: Option<String>) -> anyhow::Result<Self> {
        let endpoint = endpoint
            .map(url::Url::parse)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid session endpoint: {}", e))?;
        Ok(Self {
            endpoint,
            auth_token,
        })
    }
}

#[async_trait]
impl SessionIssuer for HttpSessionIssuer {
    async fn issue(&self, request: &SessionRequest) -> Result<IssuedSession, SessionError> {
        let endpoint = self.endpoint.clone().ok_or(SessionError::NotConfigured)?;
        let body = serde_json::to_vec(request)?;
        let token = self.auth_token.clone();

        let response = tokio::task::spawn_blocking(move || {
            curl_json::send_json("POST", endpoint.as_str(), token.as_deref(), &body)
        })
        .await
        .map_err(|e| SessionError::Request(format!("session task join: {}", e)))?
        .map_err(|e| SessionError::Request(e.to_string()))?;

        if !response.is_success() {
            return Err(SessionError::Http(response.code));
        }
        let issued: IssuedSession = serde_json::from_slice(&response.body)?;
        tracing::debug!(
            bucket = %issued.bucket,
            key = %issued.storage_path,
            "upload session issued"
        );
        Ok(issued)
    }
}
