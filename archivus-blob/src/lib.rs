//! Object store adapter contract for Archivus.
//!
//! `archivus-blob` gives the Intake Service and the download/preview paths a
//! storage-agnostic way to put and stream bytes, partitioned by tenant, with
//! optional range support. Pipeline and HTTP code embed a [`BlobAdapter`]
//! rather than talking to a [`BlobStore`] directly.
//!
//! ## Quick start
//!
//! ```rust
//! use archivus_blob::prelude::*;
//! use archivus_blob::memory::InMemoryBlobStore;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let adapter = BlobAdapter::new(InMemoryBlobStore::new(), BlobConfig::default());
//!
//! let ctx = BlobCtx::new("acme".to_string()).with_actor("user-123".to_string());
//!
//! let data = b"hello world".to_vec();
//! let stream: ByteStream = Box::pin(futures_util::stream::once(async move {
//!     Ok::<_, std::io::Error>(bytes::Bytes::from(data))
//! }));
//! let put = BlobPut::new().with_content_type("text/plain");
//! let receipt = adapter.put(ctx.clone(), put, stream).await?;
//!
//! let opened = adapter.open(ctx, receipt.id, None).await?;
//! # let _ = opened;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Pipeline/HTTP  │  ← business logic only
//! ├─────────────────┤
//! │   BlobAdapter   │  ← key derivation, size guard, receipts
//! ├─────────────────┤
//! │   BlobStore     │  ← storage primitives (memory, or a real backend)
//! └─────────────────┘
//! ```

pub mod adapter;
mod config;
mod error;
pub mod memory;
mod receipt;
pub mod store;
mod types;

pub use adapter::BlobAdapter;
pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use memory::InMemoryBlobStore;
pub use receipt::{BlobReceipt, OpenedBlob, OpenedContent, ResolvedRange, UploadInfo};
pub use store::{
    BlobKeyStrategy, BlobStore, DefaultKeyStrategy, GetResult, ObjectHead, PutResult,
    SignedUrlBlobStore, StoreCapabilities,
};
pub use types::{BlobCtx, BlobId, BlobPut, ByteRange, ByteStream};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobAdapter, BlobConfig, BlobCtx, BlobError, BlobId, BlobPut, BlobReceipt, BlobResult,
        BlobStore, ByteStream,
    };
}
