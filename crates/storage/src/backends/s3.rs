//! S3-compatible blob store using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobStat, BlobStore, blob_key};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::instrument;

/// S3-compatible blob store.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// With explicit credentials they are used directly; otherwise the
    /// ambient AWS credential chain applies. `force_path_style` is required
    /// for MinIO and some other S3-compatible services.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(StorageError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let resolved_region = region.unwrap_or_else(|| "us-east-1".to_string());
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base);

        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                key_id,
                secret,
                None,
                None,
                "coffre-config",
            ));
        }

        if let Some(endpoint_url) = endpoint {
            // Handle bare host:port endpoints (e.g., "minio:9000").
            let lower = endpoint_url.to_lowercase();
            let normalized = if lower.starts_with("http://") || lower.starts_with("https://") {
                endpoint_url
            } else {
                format!("http://{endpoint_url}")
            };
            builder = builder.endpoint_url(normalized);
        }

        if force_path_style {
            builder = builder.force_path_style(true);
        }

        // Strip trailing slashes to avoid double-slash keys like "prefix//key".
        let normalized_prefix = prefix.map(|p| p.trim_end_matches('/').to_string());

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            prefix: normalized_prefix,
        })
    }

    fn full_key(&self, hash: &str) -> StorageResult<String> {
        let key = blob_key(hash)?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key,
        })
    }

    async fn head_size(&self, hash: &str) -> StorageResult<Option<u64>> {
        let key = self.full_key(hash)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(output.content_length().unwrap_or(0).max(0) as u64)),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::S3(Box::new(service_err)))
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3Backend {
    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, hash: &str, data: Bytes) -> StorageResult<()> {
        if self.head_size(hash).await?.is_some() {
            return Err(StorageError::AlreadyExists(hash.to_string()));
        }

        let key = self.full_key(hash)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e.into_service_error())))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, hash: &str) -> StorageResult<Bytes> {
        let key = self.full_key(hash)?;
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Err(StorageError::NotFound(hash.to_string()));
                }
                return Err(StorageError::S3(Box::new(service_err)));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        Ok(data.into_bytes())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, hash: &str) -> StorageResult<()> {
        // S3 deletes are idempotent; probe first so the contract's NotFound
        // surfaces for absent objects.
        if self.head_size(hash).await?.is_none() {
            return Err(StorageError::NotFound(hash.to_string()));
        }

        let key = self.full_key(hash)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e.into_service_error())))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, hash: &str) -> StorageResult<bool> {
        Ok(self.head_size(hash).await?.is_some())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn stat(&self, hash: &str) -> StorageResult<BlobStat> {
        let size = self
            .head_size(hash)
            .await?
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))?;
        Ok(BlobStat {
            hash: hash.to_string(),
            size,
            store_path: blob_key(hash)?,
        })
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e.into_service_error())))?;
        Ok(())
    }
}
