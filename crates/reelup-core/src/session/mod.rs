//! Upload session issuance.
//!
//! A session is the bucket, storage path, and temporary credentials an
//! external endpoint hands out for one file. The manager asks for one before
//! a job exists; failure here means the job is never created.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;
use crate::job::JobId;

pub use http::HttpSessionIssuer;

/// Short-lived object-store credentials scoped to one upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    #[serde(alias = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(alias = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(default, alias = "SessionToken", skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Expiry as Unix seconds.
    #[serde(default, alias = "Expiration", skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Body sent to the session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub org: String,
    pub bucket: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Session endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedSession {
    pub bucket: String,
    pub storage_path: String,
    pub temporary_credentials: TemporaryCredentials,
}

/// Session bound to a job id.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub job_id: JobId,
    pub bucket: String,
    pub storage_key: String,
    pub credentials: TemporaryCredentials,
    /// Credential expiry (Unix seconds), if the issuer reported one.
    pub expiry: Option<i64>,
}

impl UploadSession {
    pub fn bind(job_id: JobId, issued: IssuedSession) -> Self {
        let expiry = issued.temporary_credentials.expiration;
        Self {
            job_id,
            bucket: issued.bucket,
            storage_key: issued.storage_path,
            credentials: issued.temporary_credentials,
            expiry,
        }
    }
}

/// Issues upload sessions. Injected into the manager.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, request: &SessionRequest) -> Result<IssuedSession, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_session_parses_snake_case_credentials() {
        let json = r#"{
            "bucket": "media",
            "storage_path": "acme/raw/clip.mp4",
            "temporary_credentials": {
                "access_key_id": "AKIA1",
                "secret_access_key": "s3cr3t",
                "session_token": "tok",
                "expiration": 1700000000
            }
        }"#;
        let issued: IssuedSession = serde_json::from_str(json).unwrap();
        assert_eq!(issued.bucket, "media");
        assert_eq!(issued.storage_path, "acme/raw/clip.mp4");
        assert_eq!(issued.temporary_credentials.session_token.as_deref(), Some("tok"));

        let session = UploadSession::bind(7, issued);
        assert_eq!(session.job_id, 7);
        assert_eq!(session.storage_key, "acme/raw/clip.mp4");
        assert_eq!(session.expiry, Some(1_700_000_000));
    }

    #[test]
    fn issued_session_accepts_sts_style_credentials() {
        let json = r#"{
            "bucket": "media",
            "storage_path": "k",
            "temporary_credentials": {"AccessKeyId": "A", "SecretAccessKey": "S"}
        }"#;
        let issued: IssuedSession = serde_json::from_str(json).unwrap();
        assert_eq!(issued.temporary_credentials.access_key_id, "A");
        assert!(issued.temporary_credentials.session_token.is_none());
        assert!(issued.temporary_credentials.expiration.is_none());
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = TemporaryCredentials {
            access_key_id: "AKIA1".into(),
            secret_access_key: "very-secret".into(),
            session_token: Some("token-value".into()),
            expiration: None,
        };
        let out = format!("{:?}", creds);
        assert!(out.contains("AKIA1"));
        assert!(!out.contains("very-secret"));
        assert!(!out.contains("token-value"));
    }

    #[test]
    fn session_request_uses_wire_field_names() {
        let req = SessionRequest {
            org: "acme".into(),
            bucket: "media".into(),
            file_name: "clip.mp4".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["fileName"], "clip.mp4");
        assert_eq!(v["org"], "acme");
    }
}
