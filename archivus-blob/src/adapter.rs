use std::sync::Arc;
use crate::{
    BlobConfig, BlobCtx, BlobError, BlobId, BlobKeyStrategy, BlobPut, BlobReceipt, BlobResult,
    BlobStore, ByteRange, ByteStream, DefaultKeyStrategy, OpenedBlob,
};

/// The main blob adapter - services embed this rather than talking to a
/// `BlobStore` directly.
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self {
            store: Arc::new(store),
            keys: Arc::new(DefaultKeyStrategy),
            config,
        }
    }

    /// Create with custom key strategy
    pub fn with_key_strategy<S: BlobStore + 'static, K: BlobKeyStrategy + 'static>(
        store: S,
        keys: K,
        config: BlobConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            keys: Arc::new(keys),
            config,
        }
    }

    /// Store a blob from a stream (single-shot upload)
    pub async fn put(
        &self,
        ctx: BlobCtx,
        put: BlobPut,
        body: ByteStream,
    ) -> BlobResult<BlobReceipt> {
        // Validate size if known
        if let Some(size) = put.size_hint {
            if size > self.config.max_blob_bytes {
                return Err(BlobError::invalid(format!(
                    "Blob size {} exceeds maximum {}",
                    size, self.config.max_blob_bytes
                )));
            }
        }

        let blob_id = BlobId::new();
        let key = self.keys.object_key(&ctx.tenant_id, blob_id.as_str(), &put.key_hints);

        let result = self.store.put(
            &key,
            put.content_type.as_deref(),
            body,
        ).await?;

        let mut receipt = BlobReceipt::new(blob_id, key, result.size_bytes)
            .with_attributes(put.attributes);

        if let Some(ct) = put.content_type {
            receipt = receipt.with_content_type(ct);
        }
        if let Some(filename) = put.filename {
            receipt = receipt.with_filename(filename);
        }
        if let Some(etag) = result.etag {
            receipt = receipt.with_etag(etag);
        }
        if let Some(checksum) = result.checksum {
            receipt = receipt.with_checksum(checksum);
        }

        if self.store.capabilities().supports_range {
            receipt = receipt.with_range_support();
        }

        Ok(receipt)
    }

    /// Open a blob for reading
    pub async fn open(
        &self,
        ctx: BlobCtx,
        id: BlobId,
        range: Option<ByteRange>,
    ) -> BlobResult<OpenedBlob> {
        let key = self.keys.object_key(&ctx.tenant_id, id.as_str(), &std::collections::BTreeMap::new());

        if range.is_none() && self.can_sign_urls() {
            if let Ok(url) = self.sign_get_url(&key, 3600).await {
                let expires_at = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs() as i64 + 3600;

                let receipt = self.build_receipt_from_key(&key, &id).await?;
                return Ok(OpenedBlob::signed_url(receipt, url, expires_at));
            }
        }

        let get_result = self.store.get(&key, range).await?;
        let receipt = self.build_receipt_from_get_result(&get_result, id, key);

        Ok(OpenedBlob::stream(
            receipt,
            get_result.stream,
            get_result.resolved_range.map(|r| crate::ResolvedRange {
                start: r.start,
                end: r.end,
                total_size: r.total_size,
            }),
        ))
    }

    /// Delete a blob
    pub async fn delete(&self, ctx: BlobCtx, id: BlobId) -> BlobResult<()> {
        let key = self.keys.object_key(&ctx.tenant_id, id.as_str(), &std::collections::BTreeMap::new());
        self.store.delete(&key).await
    }

    /// Check if store supports signed URLs. No bundled store implements
    /// `SignedUrlBlobStore` yet, so this always streams.
    fn can_sign_urls(&self) -> bool {
        false
    }

    /// Generate signed URL for reading (if supported)
    async fn sign_get_url(&self, _key: &str, _expires_in_secs: u64) -> BlobResult<String> {
        Err(BlobError::Unsupported)
    }

    /// Build receipt from key (for signed URLs)
    async fn build_receipt_from_key(&self, key: &str, id: &BlobId) -> BlobResult<BlobReceipt> {
        let head = self.store.head(key).await?;

        let mut receipt = BlobReceipt::new(id.clone(), key.to_string(), head.size_bytes);

        if let Some(ct) = head.content_type {
            receipt = receipt.with_content_type(ct);
        }
        if let Some(etag) = head.etag {
            receipt = receipt.with_etag(etag);
        }
        if self.store.capabilities().supports_range {
            receipt = receipt.with_range_support();
        }

        Ok(receipt)
    }

    /// Build receipt from get result
    fn build_receipt_from_get_result(
        &self,
        get_result: &crate::store::GetResult,
        id: BlobId,
        key: String,
    ) -> BlobReceipt {
        let mut receipt = BlobReceipt::new(id, key, get_result.size_bytes);

        if let Some(ct) = &get_result.content_type {
            receipt = receipt.with_content_type(ct.clone());
        }
        if let Some(etag) = &get_result.etag {
            receipt = receipt.with_etag(etag.clone());
        }
        if self.store.capabilities().supports_range {
            receipt = receipt.with_range_support();
        }

        receipt
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Check if range requests are supported
    pub fn supports_ranges(&self) -> bool {
        self.store.capabilities().supports_range
    }
}
