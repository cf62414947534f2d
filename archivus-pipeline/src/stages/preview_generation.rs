//! §4.7.9: generates a secondary preview artifact. Absence of a usable
//! preview is never an error for the document — when the source blob can't
//! be rendered into a preview, a placeholder path is recorded instead, and
//! `GET /documents/{id}/preview` serves that placeholder.

use archivus_blob::{BlobCtx, BlobPut};
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::stages::common;

const PLACEHOLDER_PATH: &str = "placeholder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewGenerationJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl PreviewGenerationJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;

        let path = match common::read_blob_bytes(ctx, &self.tenant_id, &document.storage_path).await {
            Ok(bytes) => self.store_preview(ctx, &bytes).await.unwrap_or_else(|_| PLACEHOLDER_PATH.to_string()),
            Err(_) => PLACEHOLDER_PATH.to_string(),
        };

        ctx.store.set_preview_path(document.id, path.clone());
        Ok(serde_json::json!({ "preview_path": path }))
    }

    /// Stores the same bytes back under a `previews/` key hint as a stand-in
    /// for real thumbnail rendering, which this implementation does not do.
    /// Records the receipt's blob id (not its derived key) — the same handle
    /// `storage_path` carries for the source blob, since that's what
    /// `BlobAdapter::open` expects back.
    async fn store_preview(&self, ctx: &PipelineContext, bytes: &[u8]) -> ArchivusResult<String> {
        let blob_ctx = BlobCtx::new(self.tenant_id.clone());
        let put = BlobPut::new().with_key_hint("prefix", "previews");
        let body: archivus_blob::ByteStream =
            Box::pin(futures_util::stream::once(async move { Ok(bytes::Bytes::copy_from_slice(bytes)) }));
        let receipt = ctx
            .blobs
            .put(blob_ctx, put, body)
            .await
            .map_err(|e| archivus_core::ArchivusError::storage_failure(e.to_string()))?;
        Ok(receipt.id.0)
    }
}

#[async_trait]
impl Job for PreviewGenerationJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "preview_generation";
    const PRIORITY: JobPriority = common::queue_priority(1);
    const MAX_RETRIES: u32 = 3;

    async fn execute(&self, ctx: Self::Context) -> Result<(), JobError> {
        let job = match common::begin(&ctx, self.job_id) {
            Some(job) => job,
            None => return Err(JobError::permanent(format!("job row {} missing", self.job_id))),
        };
        let outcome = common::with_timeout(common::DEFAULT_STAGE_TIMEOUT, self.run(&ctx)).await;
        common::finish(&ctx, &job, outcome)
    }
}
