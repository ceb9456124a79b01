//! Session issuer that records every request.

use async_trait::async_trait;
use std::sync::Mutex;

use reelup_core::error::SessionError;
use reelup_core::session::{IssuedSession, SessionIssuer, SessionRequest, TemporaryCredentials};

#[derive(Default)]
pub struct RecordingIssuer {
    requests: Mutex<Vec<SessionRequest>>,
    refuse: Mutex<bool>,
}

impl RecordingIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later request fail with HTTP 503.
    pub fn refuse_all(&self) {
        *self.refuse.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionIssuer for RecordingIssuer {
    async fn issue(&self, request: &SessionRequest) -> Result<IssuedSession, SessionError> {
        self.requests.lock().unwrap().push(request.clone());
        if *self.refuse.lock().unwrap() {
            return Err(SessionError::Http(503));
        }
        Ok(IssuedSession {
            bucket: request.bucket.clone(),
            storage_path: format!("{}/raw/{}", request.org, request.file_name),
            temporary_credentials: TemporaryCredentials {
                access_key_id: "ASIATEST".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: Some("token".to_string()),
                expiration: None,
            },
        })
    }
}
