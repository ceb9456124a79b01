//! Durable projection of a job.

use serde::{Deserialize, Serialize};

use crate::session::TemporaryCredentials;

use super::types::{Checkpoint, FileMeta, JobId, JobState};

/// What the store keeps for a job: everything except the live file handle
/// and the transfer handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedJobRecord {
    pub id: JobId,
    pub bucket: String,
    pub storage_key: String,
    #[serde(with = "state_serde")]
    pub state: JobState,
    pub progress: u8,
    pub credentials: TemporaryCredentials,
    pub file_meta: FileMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    pub created_at: i64,
    pub updated_at: i64,
}

mod state_serde {
    use super::JobState;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(state: &JobState, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(state.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<JobState, D::Error> {
        let s = String::deserialize(d)?;
        Ok(JobState::from_str(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_uses_state_strings() {
        let record = PersistedJobRecord {
            id: 3,
            bucket: "media".into(),
            storage_key: "acme/raw/a.mp4".into(),
            state: JobState::Paused,
            progress: 42,
            credentials: TemporaryCredentials {
                access_key_id: "A".into(),
                secret_access_key: "S".into(),
                session_token: None,
                expiration: None,
            },
            file_meta: FileMeta {
                name: "a.mp4".into(),
                size: 1000,
                mime: "video/mp4".into(),
            },
            checkpoint: None,
            created_at: 1,
            updated_at: 2,
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["state"], "paused");
        assert!(v.get("checkpoint").is_none());
        let back: PersistedJobRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, record);
    }
}
