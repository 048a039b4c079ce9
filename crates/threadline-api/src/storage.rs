use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::Region,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// Write-only object storage; returns the public URL of what was written
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3 or any S3-compatible bucket (R2, MinIO, Spaces)
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    public_base_url: Option<String>,
}

impl S3ObjectStore {
    /// Credentials come from the AWS default chain (env, profile, IMDS)
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Config("storage.bucket is empty".to_string()));
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            public_base_url: config.public_base_url.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(key = %key, size = size, "Object stored");

        Ok(object_url(
            self.public_base_url.as_deref(),
            self.endpoint.as_deref(),
            &self.bucket,
            &self.region,
            key,
        ))
    }
}

/// Deterministic public URL of an object
pub fn object_url(
    public_base_url: Option<&str>,
    endpoint: Option<&str>,
    bucket: &str,
    region: &str,
    key: &str,
) -> String {
    match (public_base_url, endpoint) {
        (Some(base), _) => format!("{}/{}", base.trim_end_matches('/'), key),
        (None, Some(endpoint)) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        (None, None) => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// In-process store for tests and local runs
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{}", key))
    }
}
