//! §4.7.2: OCR for image-like blobs that `text_extraction` couldn't read
//! directly. Whichever of extraction or OCR runs, the text-dependent stages
//! downstream only care that *one* of `extracted_text` / `ocr_text` landed —
//! so this handler enqueues the same summarization/embedding follow-ups
//! `text_extraction` would have, since that stage bailed out before reaching
//! them.

use archivus_ai::AiCtx;
use archivus_core::domain::StageType;
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{parse_tenant_id, PipelineContext};
use crate::stages::common;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl OcrJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let tenant_id = parse_tenant_id(&self.tenant_id)?;
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let text = ctx.ai.perform_ocr(&ai_ctx, &document.storage_path).await?;

        ctx.store.upsert_ai_result(document.id, |row| {
            row.ocr_text = Some(text.clone());
        });

        ctx.dispatch.enqueue_stage(tenant_id, document.id, StageType::Summarization, 5).await?;
        ctx.dispatch.enqueue_stage(tenant_id, document.id, StageType::Embedding, 2).await?;

        Ok(serde_json::json!({ "ocr_chars": text.len() }))
    }
}

#[async_trait]
impl Job for OcrJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "ocr";
    const PRIORITY: JobPriority = common::queue_priority(4);
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
