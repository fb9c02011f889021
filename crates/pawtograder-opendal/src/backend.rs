//! Storage backend implementation.

use std::time::Duration;

use bytes::Bytes;
use opendal::{Operator, services};

use crate::TRACING_TARGET;
use crate::config::{BackendType, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Unified storage backend that wraps an OpenDAL operator.
#[derive(Clone)]
pub struct StorageBackend {
    operator: Operator,
    config: StorageConfig,
}

impl StorageBackend {
    /// Creates a new storage backend from configuration.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = config.backend_name(),
            root = %config.root,
            "Storage backend initialized"
        );

        Ok(Self { operator, config })
    }

    /// Writes an object, replacing any existing content at `path`.
    ///
    /// The content type is only forwarded to backends that can store it.
    pub async fn write(
        &self,
        path: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            content_type = ?content_type,
            "Writing object"
        );

        let capability = self.operator.info().full_capability();
        match content_type {
            Some(content_type) if capability.write_with_content_type => {
                self.operator
                    .write_with(path, data)
                    .content_type(content_type)
                    .await?;
            }
            _ => {
                self.operator.write(path, data).await?;
            }
        }

        tracing::debug!(target: TRACING_TARGET, path = %path, "Object write complete");

        Ok(())
    }

    /// Issues a presigned download URL for an existing object.
    ///
    /// Presigning alone never touches the object, so existence is checked
    /// first: a missing object yields [`StorageError::NotFound`].
    pub async fn signed_url(&self, path: &str, expires_in: Duration) -> StorageResult<SignedUrl> {
        self.operator.stat(path).await?;

        let request = self.operator.presign_read(path, expires_in).await?;
        let url = request.uri().to_string();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            expires_in_secs = expires_in.as_secs(),
            "Presigned download URL issued"
        );

        Ok(SignedUrl { url, expires_in })
    }

    /// Creates an OpenDAL operator based on configuration.
    #[allow(unreachable_patterns)]
    fn create_operator(config: &StorageConfig) -> StorageResult<Operator> {
        match config.backend_type {
            BackendType::Memory => Operator::new(services::Memory::default())
                .map(|op| op.finish())
                .map_err(|e| StorageError::init(e.to_string())),

            #[cfg(feature = "s3")]
            BackendType::S3 => {
                let mut builder = services::S3::default().bucket(&config.root);

                if let Some(ref region) = config.region {
                    builder = builder.region(region);
                }

                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(ref access_key_id) = config.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }

                if let Some(ref secret_access_key) = config.secret_access_key {
                    builder = builder.secret_access_key(secret_access_key);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "gcs")]
            BackendType::Gcs => {
                let mut builder = services::Gcs::default().bucket(&config.root);

                if let Some(ref credential) = config.credential {
                    builder = builder.credential(credential);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "azblob")]
            BackendType::AzureBlob => {
                let mut builder = services::Azblob::default().container(&config.root);

                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(ref account_name) = config.account_name {
                    builder = builder.account_name(account_name);
                }

                if let Some(ref account_key) = config.account_key {
                    builder = builder.account_key(account_key);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            // Reached when the backend's cargo feature is disabled.
            _ => Err(StorageError::init(format!(
                "Backend type {} is not supported with current features",
                config.backend_type
            ))),
        }
    }
}

/// A presigned, time-limited download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The URL, including its signature query parameters.
    pub url: String,
    /// How long the URL stays valid after issuance.
    pub expires_in: Duration,
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("backend_type", &self.config.backend_type)
            .field("root", &self.config.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_backend() -> StorageBackend {
        StorageBackend::new(StorageConfig::memory()).unwrap()
    }

    #[tokio::test]
    async fn write_stores_bytes() {
        let storage = memory_backend();
        let data = Bytes::from_static(b"tarball bytes");

        storage
            .write("org/repo/abc/grader.tgz", data.clone(), Some("application/gzip"))
            .await
            .unwrap();

        let stored = storage.operator.read("org/repo/abc/grader.tgz").await.unwrap();
        assert_eq!(stored.to_bytes(), data);
    }

    #[tokio::test]
    async fn write_replaces_existing_object() {
        let storage = memory_backend();
        storage
            .write("a/b", Bytes::from_static(b"old"), None)
            .await
            .unwrap();
        storage
            .write("a/b", Bytes::from_static(b"new"), None)
            .await
            .unwrap();

        let stored = storage.operator.read("a/b").await.unwrap();
        assert_eq!(stored.to_bytes(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn signed_url_for_missing_object_is_not_found() {
        let storage = memory_backend();

        let err = storage
            .signed_url("org/repo/missing/grader.tgz", Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn debug_hides_credentials() {
        let storage = StorageBackend::new(
            StorageConfig::memory().with_credentials("key", "super-secret"),
        )
        .unwrap();

        let debug = format!("{storage:?}");
        assert!(!debug.contains("super-secret"));
    }
}
