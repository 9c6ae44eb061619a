use super::UsageStore;
use crate::models::{UsageRecord, UsageStoreConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, Client as S3Client};
use uuid::Uuid;

pub struct S3UsageStore {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3UsageStore {
    pub async fn new(config: &UsageStoreConfig) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "usage-store",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .load()
            .await;

        // Path-style addressing keeps MinIO and other self-hosted stores working.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.trim_matches('/').to_string(),
        })
    }

    fn key_for(&self, record: &UsageRecord) -> String {
        record_key(&self.prefix, record, Uuid::new_v4())
    }
}

/// `<prefix>/<YYYY-MM-DD>/<timestamp>-<uuid>.json`
fn record_key(prefix: &str, record: &UsageRecord, id: Uuid) -> String {
    let name = format!(
        "{}/{}-{}.json",
        record.created_at.format("%Y-%m-%d"),
        record.created_at.format("%Y%m%dT%H%M%S%.3fZ"),
        id
    );
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[async_trait]
impl UsageStore for S3UsageStore {
    async fn record(&self, record: &UsageRecord) -> Result<String> {
        let key = self.key_for(record);
        let body = ByteStream::from(serde_json::to_vec(record)?);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to write usage record: {}", e)))?;

        Ok(key)
    }

    async fn ping(&self) -> Result<String> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to reach bucket {}: {}", self.bucket, e)))?;

        Ok(format!("Connected to usage store bucket '{}'", self.bucket))
    }
}
