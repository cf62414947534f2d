//! §4.7.7: `embedding_generation`. Long documents are chunked before calling
//! the AI adapter and the per-chunk vectors are mean-pooled into one; per the
//! Open Question resolution in §9, a failure here never blocks the document
//! from reaching `completed` — it just leaves `document.embedding` unset.

use archivus_ai::AiCtx;
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::stages::common;

const CHUNK_CHARS: usize = 2_000;
const EMBEDDING_MODEL: &str = "archivus-embedding-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl EmbeddingJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;
        let text = common::require_source_text(ctx, document.id)?;

        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let chunks = common::chunk_text(&text, CHUNK_CHARS);
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            vectors.push(ctx.ai.generate_embedding(&ai_ctx, chunk).await?);
        }
        let pooled = common::mean_pool(&vectors);

        ctx.store.upsert_embedding(document.id, |row| {
            row.vector = Some(pooled.clone());
            row.model = Some(EMBEDDING_MODEL.to_string());
        });

        Ok(serde_json::json!({ "dimensions": pooled.len(), "chunks": chunks.len() }))
    }
}

#[async_trait]
impl Job for EmbeddingJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "embedding_generation";
    const PRIORITY: JobPriority = common::queue_priority(2);
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
