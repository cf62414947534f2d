//! §4.7.8: `financial_extraction`. Only eligible for `Invoice`/`Receipt`
//! documents — the Intake Service gates enqueueing this stage on document
//! type rather than this handler doing it, since a non-eligible type should
//! never produce this job in the first place. Amounts are carried through as
//! the AI adapter's minor-units integers; a missing currency falls back to
//! the tenant's `default_currency`.

use archivus_ai::AiCtx;
use archivus_core::ArchivusResult;
use archivus_queue::{Job, JobError, JobPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{parse_tenant_id, PipelineContext};
use crate::stages::common;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialExtractionJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: String,
}

impl FinancialExtractionJob {
    async fn run(&self, ctx: &PipelineContext) -> ArchivusResult<serde_json::Value> {
        let tenant_id = parse_tenant_id(&self.tenant_id)?;
        let document = common::load_document(ctx, self.document_id)?;
        common::require_not_deleted(&document)?;
        let text = common::require_source_text(ctx, document.id)?;
        let tenant = ctx.store.get_tenant(tenant_id)?;

        let doc_type = format!("{:?}", document.document_type).to_ascii_lowercase();
        let ai_ctx = AiCtx::new(self.tenant_id.clone());
        let data = ctx.ai.extract_financial_data(&ai_ctx, &text, &doc_type).await?;

        let currency = data.currency.unwrap_or_else(|| tenant.currency_for_financials().to_string());

        ctx.store.upsert_financial(document.id, |row| {
            row.amount_minor_units = data.total_amount_minor_units;
            row.currency = Some(currency.clone());
            row.tax_minor_units = data.tax_amount_minor_units;
            row.vendor = data.vendor.clone();
            row.customer = data.client.clone();
            row.due_date = data.due_date;
        });

        Ok(serde_json::json!({
            "amount_minor_units": data.total_amount_minor_units,
            "currency": currency,
        }))
    }
}

#[async_trait]
impl Job for FinancialExtractionJob {
    type Context = PipelineContext;
    type Result = ();

    const JOB_TYPE: &'static str = "financial_extraction";
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
