//! In-memory `BlobStore`, useful for tests and for running the full pipeline
//! without a real object-storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::store::{BlobStore, GetResult, ObjectHead, PutResult, ResolvedRange, StoreCapabilities};
use crate::{BlobError, BlobResult, ByteRange, ByteStream};

struct StoredObject {
    bytes: Bytes,
    content_type: Option<String>,
    etag: String,
    last_modified: i64,
}

/// A `BlobStore` backed by a process-local map. Not durable, not shared
/// across processes; exists so adapters and pipeline stages have something
/// concrete to run against in dev and in tests.
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let bytes = buf.freeze();
        let size_bytes = bytes.len() as u64;
        let etag = format!("{:x}", md5_like_digest(&bytes));
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| BlobError::backend_str("in-memory store lock poisoned"))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.map(|s| s.to_string()),
                etag: etag.clone(),
                last_modified: now,
            },
        );

        Ok(PutResult {
            etag: Some(etag),
            size_bytes,
            checksum: None,
        })
    }

    async fn get(&self, key: &str, range: Option<ByteRange>) -> BlobResult<GetResult> {
        let (bytes, content_type, etag) = {
            let objects = self
                .objects
                .read()
                .map_err(|_| BlobError::backend_str("in-memory store lock poisoned"))?;
            let object = objects
                .get(key)
                .ok_or_else(|| BlobError::not_found(key.to_string()))?;
            (object.bytes.clone(), object.content_type.clone(), object.etag.clone())
        };

        let total_size = bytes.len() as u64;

        let (slice, resolved_range) = match range {
            Some(r) => {
                if !r.is_valid(total_size) {
                    return Err(BlobError::invalid(format!(
                        "range {:?} is not valid for object of size {}",
                        r, total_size
                    )));
                }
                let resolved = ResolvedRange::from_request_parts(&r, total_size);
                let slice = bytes.slice(resolved.start as usize..=resolved.end as usize);
                (slice, Some(resolved))
            }
            None => (bytes, None),
        };

        let size_bytes = slice.len() as u64;
        let stream: ByteStream = Box::pin(futures_util::stream::once(async move {
            Ok::<_, std::io::Error>(slice)
        }));

        Ok(GetResult {
            stream,
            size_bytes,
            content_type,
            etag: Some(etag),
            resolved_range,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let objects = self
            .objects
            .read()
            .map_err(|_| BlobError::backend_str("in-memory store lock poisoned"))?;
        let object = objects
            .get(key)
            .ok_or_else(|| BlobError::not_found(key.to_string()))?;

        Ok(ObjectHead {
            size_bytes: object.bytes.len() as u64,
            content_type: object.content_type.clone(),
            etag: Some(object.etag.clone()),
            last_modified: Some(object.last_modified),
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| BlobError::backend_str("in-memory store lock poisoned"))?;
        objects.remove(key);
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_range()
    }
}

impl ResolvedRange {
    fn from_request_parts(range: &ByteRange, total_size: u64) -> Self {
        let end = range.end.unwrap_or(total_size - 1).min(total_size - 1);
        Self {
            start: range.start,
            end,
            total_size,
        }
    }
}

/// Cheap content fingerprint for etags. Not cryptographic; good enough to
/// detect that two puts produced different bytes.
fn md5_like_digest(bytes: &Bytes) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}
