//! §4.7.4: `entity_extraction`, enqueued immediately in the Intake Service's
//! initial batch and retried (via the requires-predicate pattern) until
//! `text_extraction` produces source text.

use archivus_ai::AiCtx;
use archivus_core::{ArchivusError, ArchivusResult};
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::stages::common;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityExtractionJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl EntityExtractionJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;
        let text = common::require_source_text(ctx, document.id)?;

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let entities = ctx.ai.extract_entities(&ai_ctx, &text).await?;
        let entities_json = serde_json::to_value(&entities)
            .map_err(|e| ArchivusError::internal(format!("failed to serialize extracted entities: {e}")))?;

        ctx.store.upsert_ai_result(document.id, |row| {
            row.extracted_entities = Some(entities_json.clone());
        });

        Ok(entities_json)
    }
}

#[async_trait]
impl Job for EntityExtractionJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "entity_extraction";
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
