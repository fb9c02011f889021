//! Storage configuration types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    /// In-process memory storage. Does not support presigned URLs.
    #[default]
    Memory,
    /// Amazon S3 and S3-compatible storage (Supabase Storage, MinIO, R2).
    S3,
    /// Google Cloud Storage.
    Gcs,
    /// Azure Blob Storage.
    #[strum(serialize = "azblob")]
    #[serde(rename = "azblob")]
    AzureBlob,
}

/// Storage backend configuration.
///
/// `root` names the bucket (S3, GCS) or container (Azure Blob). Credential
/// fields are only read by the backends that use them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct StorageConfig {
    /// Backend kind.
    pub backend_type: BackendType,
    /// Bucket or container name.
    pub root: String,
    /// Region (S3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Access key ID (S3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// Secret access key (S3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// Account name (Azure Blob).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Account key (Azure Blob).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
    /// Service account credential, base64 encoded (GCS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl StorageConfig {
    /// Creates a configuration for the given backend and bucket.
    pub fn new(backend_type: BackendType, root: impl Into<String>) -> Self {
        Self {
            backend_type,
            root: root.into(),
            ..Self::default()
        }
    }

    /// Creates an in-memory configuration.
    pub fn memory() -> Self {
        Self::new(BackendType::Memory, "/")
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the custom endpoint (for S3-compatible storage).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the S3 access credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets the Azure Blob account credentials.
    pub fn with_account(
        mut self,
        account_name: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Self {
        self.account_name = Some(account_name.into());
        self.account_key = Some(account_key.into());
        self
    }

    /// Sets the GCS service account credential.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        self.backend_type.into()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn backend_type_parses_from_cli_names() {
        assert_eq!(BackendType::from_str("s3").unwrap(), BackendType::S3);
        assert_eq!(BackendType::from_str("azblob").unwrap(), BackendType::AzureBlob);
        assert_eq!(BackendType::from_str("memory").unwrap(), BackendType::Memory);
        assert!(BackendType::from_str("dropbox").is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let config = StorageConfig::new(BackendType::S3, "graders")
            .with_region("us-east-1")
            .with_endpoint("http://localhost:9000")
            .with_credentials("key", "secret");

        assert_eq!(config.root, "graders");
        assert_eq!(config.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.access_key_id.as_deref(), Some("key"));
        assert_eq!(config.backend_name(), "s3");
    }
}
