//! archivus-queue: multi-tenant job queue for document processing pipelines.
//!
//! Lease tokens, an expiry reaper, cancel-wins semantics, and tenant-scoped
//! idempotency give at-least-once delivery with an idempotent-handler
//! contract. Stage handlers enqueue small reference payloads (document ids,
//! not document bytes) and are dispatched through a type-safe [`Job`] trait.
//!
//! ```rust
//! use archivus_queue::prelude::*;
//! use archivus_queue::backend::memory::MemoryBackend;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct ExtractTextJob {
//!     document_id: String,
//! }
//!
//! #[async_trait::async_trait]
//! impl Job for ExtractTextJob {
//!     type Context = ();
//!     type Result = ();
//!
//!     const JOB_TYPE: &'static str = "extract_text";
//!     const PRIORITY: JobPriority = JobPriority::Normal;
//!
//!     async fn execute(&self, _ctx: Self::Context) -> Result<Self::Result, JobError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> QueueResult<()> {
//! let adapter = QueueAdapter::new(MemoryBackend::new());
//! adapter.register_job::<ExtractTextJob>().await?;
//!
//! let ctx = QueueCtx::new("tenant-123".to_string());
//! let job = ExtractTextJob { document_id: "doc-1".to_string() };
//! let job_id = adapter.enqueue(ctx, job).await?;
//! # let _ = job_id;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod error;
pub mod codec;
pub mod job;
pub mod backend;
pub mod adapter;
pub mod observability;

pub use adapter::QueueAdapter;
pub use types::{
    JobId, QueueCtx, JobPriority, JobStatus, JobMessage, JobRecord,
    LeasedJob, QueueCapabilities, JobEvent
};
pub use error::{QueueError, QueueResult, JobError};
pub use codec::{JobCodec, CodecRegistry};
pub use codec::json::JsonCodec;
pub use job::{Job, JobRegistry};
pub use backend::QueueBackend;
pub use adapter::{WorkerHandle, QueueConfig};

pub use observability::{ObservabilityLayer, LiveMetrics};

/// Prelude for job producers and worker pools.
pub mod prelude {
    pub use crate::{
        QueueAdapter, Job, QueueBackend
    };

    pub use crate::{
        QueueCtx, JobId, JobPriority, JobStatus, JobError, QueueResult
    };

    pub use crate::{
        JobCodec, JsonCodec, CodecRegistry
    };

    pub use crate::JobRegistry;

    pub use crate::{ObservabilityLayer, LiveMetrics};

    pub use async_trait::async_trait;
}
