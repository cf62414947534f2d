//! §4.7.5: `document_classification`. Confidence above 0.7 promotes the
//! predicted type onto the core `Document` row; at or below that bar the
//! prior type is retained but the model's actual confidence is still
//! recorded. Only when the provider returns malformed output entirely does
//! confidence fall back to a deliberately low 0.1 rather than failing the
//! document outright.

use archivus_ai::AiCtx;
use archivus_core::domain::DocumentType;
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::stages::common;

const CONFIDENCE_THRESHOLD: f32 = 0.7;
const RETAINED_CONFIDENCE: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl ClassificationJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;
        let text = common::require_source_text(ctx, document.id)?;

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let (document_type, confidence, label): (DocumentType, f32, Option<String>) =
            match ctx.ai.classify_document(&ai_ctx, &text).await {
                Ok(result) if result.confidence > CONFIDENCE_THRESHOLD => {
                    (common::map_document_type(&result.doc_type), result.confidence, Some(result.doc_type))
                }
                Ok(result) => (document.document_type, result.confidence, Some(result.doc_type)),
                Err(err) if !err.is_retryable() => (document.document_type, RETAINED_CONFIDENCE, None),
                Err(err) => return Err(err.into()),
            };

        let updated = ctx.store.update_document(document.id, document.version, |d| {
            d.document_type = document_type;
        })?;

        ctx.store.upsert_ai_result(document.id, |row| {
            row.classification = label;
            row.confidence = Some(confidence);
        });

        Ok(serde_json::json!({
            "document_type": format!("{:?}", updated.document_type),
            "confidence": confidence,
        }))
    }
}

#[async_trait]
impl Job for ClassificationJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "document_classification";
    const PRIORITY: JobPriority = common::queue_priority(3);
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
