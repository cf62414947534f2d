//! §4.7.1: the entry stage of the graph. Pulls the stored blob, extracts raw
//! text, and fans out to the stages that depend on text existing —
//! `document_summarization` and `embedding_generation` are enqueued as
//! follow-ups here rather than in the Intake Service's initial batch, since
//! both require text that doesn't exist until this stage completes.
//! Non-extractable content (images) is routed to `ocr` instead of failing.

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
pub struct TextExtractionJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl TextExtractionJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let tenant_id = parse_tenant_id(&self.tenant_id)?;
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;

        if !super::is_text_extractable(&document.content_type) {
            ctx.dispatch.enqueue_stage(tenant_id, document.id, StageType::Ocr, 4).await?;
            return Ok(serde_json::json!({
                "skipped": true,
                "reason": "content type is not directly text-extractable, routed to ocr",
            }));
        }

        let raw = common::read_blob_bytes(ctx, &self.tenant_id, &document.storage_path).await?;
        let raw_text = String::from_utf8_lossy(&raw).into_owned();

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let extracted = ctx.ai.extract_text(&ai_ctx, &raw_text).await?;

        ctx.store.upsert_ai_result(document.id, |row| {
            row.extracted_text = Some(extracted.clone());
        });

        ctx.dispatch.enqueue_stage(tenant_id, document.id, StageType::Summarization, 5).await?;
        ctx.dispatch.enqueue_stage(tenant_id, document.id, StageType::Embedding, 2).await?;

        Ok(serde_json::json!({ "extracted_chars": extracted.len() }))
    }
}

#[async_trait]
impl Job for TextExtractionJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "text_extraction";
    const PRIORITY: JobPriority = common::queue_priority(5);
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
