use async_trait::async_trait;
use chrono::Datelike;
use crate::{BlobResult, ByteRange, ByteStream};

/// Core blob storage operations - must be implemented by all storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob from a stream
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Get a blob as a stream, optionally with range support
    async fn get(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> BlobResult<GetResult>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Delete a blob
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Get store capabilities
    fn capabilities(&self) -> StoreCapabilities;
}

/// Optional signed URL support. No bundled store implements this; it's here
/// so a real object-storage backend can opt in without changing BlobAdapter.
#[async_trait]
pub trait SignedUrlBlobStore: BlobStore {
    /// Generate a signed URL for reading
    async fn sign_get(&self, key: &str, expires_in_secs: u64) -> BlobResult<String>;

    /// Generate a signed URL for writing
    async fn sign_put(
        &self,
        key: &str,
        content_type: Option<&str>,
        expires_in_secs: u64,
    ) -> BlobResult<String>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
    pub checksum: Option<String>,
}

/// Result of a get operation
pub struct GetResult {
    pub stream: ByteStream,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub resolved_range: Option<ResolvedRange>,
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<i64>,
}

/// Resolved range information
#[derive(Debug, Clone)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

/// Store capabilities
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    pub supports_range: bool,
    pub supports_signed_urls: bool,
}

impl StoreCapabilities {
    pub fn basic() -> Self {
        Self {
            supports_range: false,
            supports_signed_urls: false,
        }
    }

    pub fn with_range(mut self) -> Self {
        self.supports_range = true;
        self
    }

    pub fn with_signed_urls(mut self) -> Self {
        self.supports_signed_urls = true;
        self
    }
}

/// Strategy for generating blob keys
pub trait BlobKeyStrategy: Send + Sync {
    /// Generate a key for a blob
    fn object_key(&self, tenant_id: &str, blob_id: &str, hints: &std::collections::BTreeMap<String, String>) -> String;

    /// Generate a key for a derived asset (e.g. a preview)
    fn derived_key(&self, original_key: &str, kind: &str) -> String;
}

/// Default key strategy: tenant/year/month/blob_id
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy;

impl BlobKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, tenant_id: &str, blob_id: &str, _hints: &std::collections::BTreeMap<String, String>) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        
        let dt = chrono::DateTime::from_timestamp(now as i64, 0)
            .unwrap_or_else(|| chrono::Utc::now());
        
        format!("{}/{:04}/{:02}/{}", 
            tenant_id, 
            dt.year(), 
            dt.month(), 
            blob_id
        )
    }

    fn derived_key(&self, original_key: &str, kind: &str) -> String {
        format!("{}.{}", original_key, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_tenant_partitioned() {
        let strategy = DefaultKeyStrategy;
        let key = strategy.object_key("acme", "blob-1", &std::collections::BTreeMap::new());
        assert!(key.starts_with("acme/"));
        assert!(key.ends_with("/blob-1"));
    }

    #[test]
    fn derived_key_appends_kind() {
        let strategy = DefaultKeyStrategy;
        assert_eq!(strategy.derived_key("acme/2026/07/blob-1", "preview"), "acme/2026/07/blob-1.preview");
    }
}
