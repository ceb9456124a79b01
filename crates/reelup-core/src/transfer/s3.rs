//! S3 multipart transport (aws-sdk-s3) using each job's temporary credentials.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::time::{Duration, UNIX_EPOCH};

use crate::config::StorageConfig;
use crate::job::PartReceipt;
use crate::session::TemporaryCredentials;

use super::transport::{MultipartTransport, TransportError, UploadTarget};

const PROVIDER_NAME: &str = "reelup-upload-session";

/// Talks to S3 or an S3-compatible store. A client is built per call from
/// the target's credentials, since every job carries its own.
#[derive(Debug, Clone)]
pub struct S3Transport {
    endpoint: Option<String>,
    region: String,
    force_path_style: bool,
}

impl S3Transport {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            region: cfg.region.clone(),
            force_path_style: cfg.force_path_style,
        }
    }

    fn client(&self, creds: &TemporaryCredentials) -> Client {
        let expires_after = creds
            .expiration
            .filter(|s| *s > 0)
            .map(|s| UNIX_EPOCH + Duration::from_secs(s as u64));
        let credentials = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            creds.session_token.clone(),
            expires_after,
            PROVIDER_NAME,
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(self.force_path_style);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Client::from_conf(builder.build())
    }
}

/// Maps an SDK error onto the transfer taxonomy. `NoSuchUpload` means the
/// multipart upload is gone and a checkpoint pointing at it is useless.
fn classify<E, R>(err: SdkError<E, R>, upload_id: Option<&str>) -> TransportError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let Some(service) = err.as_service_error() {
        if service.code() == Some("NoSuchUpload") {
            return TransportError::UploadNotFound(upload_id.unwrap_or_default().to_string());
        }
        return TransportError::Rejected(format!("{}", DisplayErrorContext(&err)));
    }
    TransportError::Network(format!("{}", DisplayErrorContext(&err)))
}

#[async_trait]
impl MultipartTransport for S3Transport {
    async fn create_upload(&self, target: &UploadTarget) -> Result<String, TransportError> {
        let out = self
            .client(&target.credentials)
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .content_type(&target.content_type)
            .send()
            .await
            .map_err(|e| classify(e, None))?;
        out.upload_id()
            .map(str::to_string)
            .ok_or_else(|| TransportError::Rejected("no upload id in response".to_string()))
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, TransportError> {
        let out = self
            .client(&target.credentials)
            .upload_part()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(e, Some(upload_id)))?;
        Ok(out.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> Result<(), TransportError> {
        let completed: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .e_tag(&p.etag)
                    .part_number(p.part_number)
                    .build()
            })
            .collect();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();

        self.client(&target.credentials)
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| classify(e, Some(upload_id)))?;
        Ok(())
    }

    async fn abort_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), TransportError> {
        self.client(&target.credentials)
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| classify(e, Some(upload_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_client_for_custom_endpoint() {
        let transport = S3Transport::new(&StorageConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            region: "us-east-1".to_string(),
            force_path_style: true,
        });
        let client = transport.client(&TemporaryCredentials {
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
            session_token: None,
            expiration: Some(1_700_000_000),
        });
        assert_eq!(
            client.config().region().map(|r| r.to_string()),
            Some("us-east-1".to_string())
        );
    }
}
