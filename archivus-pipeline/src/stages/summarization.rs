//! §4.7.3: `document_summarization`. Enqueued as a follow-up by whichever of
//! `text_extraction` / `ocr` produces source text first.

use archivus_ai::AiCtx;
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::stages::common;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl SummarizationJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;
        let text = common::require_source_text(ctx, document.id)?;

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let summary = ctx.ai.generate_summary(&ai_ctx, &text).await?;

        ctx.store.upsert_ai_result(document.id, |row| {
            row.summary = Some(summary.clone());
        });

        Ok(serde_json::json!({ "summary_chars": summary.len() }))
    }
}

#[async_trait]
impl Job for SummarizationJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "document_summarization";
    const PRIORITY: JobPriority = common::queue_priority(5);
    const MAX_RETRIES: u32 = 3;

    async fn execute(&self, ctx: Self::Context) -> Result<(), JobError> {
        let job = match common::begin(&ctx, self.job_id) {
            Some(job) => job,
            None => return Err(JobError::permanent(format!("job row {} missing", self.job_id))),
        };
        let outcome = common::with_timeout(common::EXTENDED_STAGE_TIMEOUT, self.run(&ctx)).await;
        common::finish(&ctx, &job, outcome)
    }
}
