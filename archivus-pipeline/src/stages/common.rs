//! Shared bookkeeping every stage handler needs: marking the domain `Job`
//! row in progress / completed / failed, mapping `ArchivusError` onto
//! `archivus_queue::JobError`'s retryable/permanent split, and applying the
//! stage timeout at the handler level (the teacher's worker loop dispatches
//! through `registry.execute_job` without wrapping it in a timeout itself,
//! so each handler bounds its own I/O).

use std::future::Future;
use std::time::Duration;

use archivus_blob::{BlobCtx, OpenedBlob, OpenedContent};
use archivus_core::domain::{
    Document, DocumentAiResult, DocumentStatus, DocumentType, Job as DomainJob,
    JobStatus as DomainJobStatus, StageType,
};

use archivus_core::{ArchivusError, ArchivusResult, ErrorKind};
use archivus_queue::JobError;
use chrono::Utc;
use futures_util::StreamExt;
use uuid::Uuid;

use crate::context::PipelineContext;

/// Looks up a document by its raw id, independent of tenant scope — stage
/// handlers already trust the `tenant_id` carried in the job payload, so the
/// tenancy-mismatch-is-404 rule the HTTP layer enforces does not apply here.
pub fn load_document(ctx: &PipelineContext, document_id: Uuid) -> ArchivusResult<Document> {
    ctx.store
        .get_document_unscoped(document_id)
        .ok_or_else(|| ArchivusError::not_found(format!("document {document_id} not found")))
}

/// A soft-deleted document's in-flight jobs terminate rather than proceed —
/// cancel wins over whatever stage work was scheduled (§9).
pub fn require_not_deleted(document: &Document) -> ArchivusResult<()> {
    if document.is_soft_deleted() {
        return Err(ArchivusError::cancelled("document soft-deleted"));
    }
    Ok(())
}

/// Buffers an opened blob's content fully into memory. Every bundled
/// `BlobStore` streams rather than signs URLs (`BlobAdapter::can_sign_urls`
/// is hard-wired `false`), so stage handlers always hit the `Stream` arm in
/// practice; the `SignedUrl` arm is handled for completeness.
pub async fn read_blob_bytes(ctx: &PipelineContext, tenant_id: &str, storage_path: &str) -> ArchivusResult<Vec<u8>> {
    let blob_ctx = BlobCtx::new(tenant_id.to_string());
    let opened: OpenedBlob = ctx
        .blobs
        .open(blob_ctx, archivus_blob::BlobId::from_string(storage_path.to_string()), None)
        .await
        .map_err(|e| ArchivusError::storage_failure(e.to_string()))?;

    match opened.content {
        OpenedContent::Stream { mut stream, .. } => {
            let mut buf = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| ArchivusError::storage_failure(e.to_string()))?;
                buf.extend_from_slice(&chunk);
            }
            Ok(buf)
        }
        OpenedContent::SignedUrl { .. } => {
            Err(ArchivusError::capability_unavailable("signed-url blob retrieval is not wired into stage handlers"))
        }
    }
}

/// §4.7's default per-stage timeout.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Embedding and summarization call out to the AI provider for the longest
/// single operation in the graph; §4.7.3/§4.7.7 call out that these two may
/// run longer than the default.
pub const EXTENDED_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs `fut`, turning an elapsed `timeout` into a retryable
/// `TransientUpstream` error rather than a hang.
pub async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = ArchivusResult<T>>,
) -> ArchivusResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ArchivusError::transient_upstream("stage handler exceeded its timeout")),
    }
}

/// Marks the domain job row `in_progress` and counts this as an attempt —
/// `job.attempts` after this call is the number of times execution has
/// started, successful or not, so a job that fails once then succeeds on
/// retry ends with `attempts=2` (§8 S4/S6).
pub fn begin(ctx: &PipelineContext, job_id: Uuid) -> Option<DomainJob> {
    ctx.store.update_job(job_id, |job| {
        job.status = DomainJobStatus::InProgress;
        job.started_at = Some(Utc::now());
        job.attempts += 1;
    })
}

/// Marks the domain job row `completed` with the given result payload.
pub fn finish_ok(ctx: &PipelineContext, job: &DomainJob, result: serde_json::Value) {
    let started_at = job.started_at;
    ctx.store.update_job(job.id, |job| {
        job.status = DomainJobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.processing_time_ms = started_at.map(|s| (Utc::now() - s).num_milliseconds().max(0) as u64);
        job.result = Some(result);
        job.error_message = None;
    });
}

/// Records the soft-delete-wins termination on the domain job row. The
/// domain `JobStatus` enum (§3) has no dedicated `Cancelled` bucket, so
/// cancellation is recorded as `Completed` with an `error_message` prefix
/// distinguishing it from a real completion — see DESIGN.md.
pub fn finish_cancelled(ctx: &PipelineContext, job: &DomainJob) {
    ctx.store.update_job(job.id, |job| {
        job.status = DomainJobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.error_message = Some("cancelled: document soft-deleted".to_string());
    });
}

/// Records a failed attempt on the domain job row (mirroring the retry
/// bookkeeping `archivus_queue`'s own backend performs independently) and
/// maps the error onto the `JobError` the queue dispatch loop understands.
/// `job.attempts` was already bumped by [`begin`]; this only decides whether
/// there's budget left for the queue to retry.
pub fn finish_err(ctx: &PipelineContext, job: &DomainJob, err: ArchivusError) -> JobError {
    let will_retry = err.retryable() && job.attempts < job.max_attempts;
    ctx.store.update_job(job.id, |job| {
        job.error_message = Some(err.message.clone());
        job.status = if will_retry { DomainJobStatus::Queued } else { DomainJobStatus::Failed };
        if !will_retry {
            job.completed_at = Some(Utc::now());
        }
    });

    if err.retryable() {
        JobError::retryable(err.message)
    } else {
        JobError::permanent(err.message)
    }
}

/// Maps the auto-detect/classification vocabulary onto the domain
/// `DocumentType` enum, which carries only the six variants a document can
/// actually be filed under. `Spreadsheet`/`Presentation` compress to
/// `Report`, anything else unrecognized (including `General`) compresses to
/// `Other` — see DESIGN.md.
pub fn map_document_type(raw: &str) -> DocumentType {
    match raw.to_ascii_lowercase().as_str() {
        "invoice" => DocumentType::Invoice,
        "receipt" => DocumentType::Receipt,
        "contract" => DocumentType::Contract,
        "report" | "spreadsheet" | "presentation" => DocumentType::Report,
        "correspondence" => DocumentType::Correspondence,
        _ => DocumentType::Other,
    }
}

/// Splits `text` into roughly `chunk_chars`-sized pieces on char boundaries,
/// for the embedding stage's chunk-then-mean-pool strategy on long documents.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Element-wise mean across equal-length embedding vectors. Panics-free:
/// vectors of mismatched length are ignored rather than causing a panic, on
/// the assumption a single embedding model produces a fixed dimension.
pub fn mean_pool(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = match vectors.first() {
        Some(v) => v.len(),
        None => return Vec::new(),
    };
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for v in vectors.iter().filter(|v| v.len() == dim) {
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
        count += 1;
    }
    if count == 0 {
        return Vec::new();
    }
    sum.iter().map(|s| s / count as f32).collect()
}

/// Tag normalization for the `semantic_analysis` stage: trim, lowercase,
/// drop empties, dedupe while preserving first-seen order, cap at 20 so a
/// chatty provider can't balloon the tag set.
/// §4.7.6: each tag is alphanumeric plus space and hyphen, length 2..50.
/// Tags failing the character or length check are dropped rather than
/// truncated or rewritten.
fn is_valid_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '-'
}

pub fn normalize_tags(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.chars().count() < 2 || tag.chars().count() > 50 {
            continue;
        }
        if !tag.chars().all(is_valid_tag_char) {
            continue;
        }
        if !seen.insert(tag.clone()) {
            continue;
        }
        out.push(tag);
        if out.len() == 20 {
            break;
        }
    }
    out
}

/// The financial_extraction stage is only eligible for document types that
/// plausibly carry financial fields. §4.7's gate names `Invoice`, `Receipt`,
/// `BankStatement`, `Payroll`, and `TaxDocument`; the latter three have no
/// corresponding domain variant after the compression above, so eligibility
/// here is `{Invoice, Receipt}`.
pub fn is_financial_eligible(document_type: DocumentType) -> bool {
    matches!(document_type, DocumentType::Invoice | DocumentType::Receipt)
}

/// Every text-dependent stage (everything but `text_extraction`, `ocr`, and
/// `preview_generation`) needs whichever of `extracted_text` / `ocr_text`
/// landed first. Returns `Retryable` until one does — the "requires
/// predicate unmet" pattern from §9.
pub fn require_source_text(ctx: &PipelineContext, document_id: Uuid) -> ArchivusResult<String> {
    let ai_result: Option<DocumentAiResult> = ctx.store.get_ai_result(document_id);
    let text = ai_result.and_then(|r| r.extracted_text.or(r.ocr_text));
    text.ok_or_else(|| ArchivusError::transient_upstream("extraction/ocr text not yet available"))
}

/// The skeleton every stage handler's `Job::execute` reduces to: run the
/// stage body, route a soft-delete cancellation to [`finish_cancelled`], and
/// map everything else through [`finish_ok`] / [`finish_err`].
pub fn finish(ctx: &PipelineContext, job: &DomainJob, outcome: ArchivusResult<serde_json::Value>) -> Result<(), JobError> {
    let result = match outcome {
        Ok(value) => {
            finish_ok(ctx, job, value);
            Ok(())
        }
        Err(err) if err.kind == ErrorKind::Cancelled => {
            finish_cancelled(ctx, job);
            Ok(())
        }
        Err(err) => Err(finish_err(ctx, job, err)),
    };
    maybe_finalize_document(ctx, job.document_id);
    // §4.5 step 6: every worker pass against a job bumps the tenant's
    // api_used counter, success or failure alike.
    if let Err(e) = ctx.quota.bump_api(job.tenant_id, 1) {
        tracing::warn!(tenant_id = %job.tenant_id, error = %e, "failed to bump api_used after job completion");
    }
    result
}

/// §9: "after all initially enqueued stages reach a terminal state, set
/// `status=completed` if at least extraction succeeded, else `error`." Since
/// a stage's own follow-ups (e.g. `text_extraction`'s summarization/embedding
/// enqueues) are always inserted before that stage's own job is marked
/// terminal, checking "every known job for this document is terminal" here
/// — on every job completion — converges to the same answer without needing
/// a separate count of the "initial" batch.
fn maybe_finalize_document(ctx: &PipelineContext, document_id: Uuid) {
    let jobs = ctx.store.jobs_for_document(document_id);
    if jobs.is_empty() {
        return;
    }
    let all_terminal = jobs
        .iter()
        .all(|j| matches!(j.status, DomainJobStatus::Completed | DomainJobStatus::Failed));
    if !all_terminal {
        return;
    }

    let Some(document) = ctx.store.get_document_unscoped(document_id) else { return };
    if document.is_soft_deleted() || document.status != DocumentStatus::Processing {
        return;
    }

    let extraction_succeeded = jobs
        .iter()
        .any(|j| j.stage_type == StageType::Extraction && j.status == DomainJobStatus::Completed);
    let next_status = if extraction_succeeded { DocumentStatus::Completed } else { DocumentStatus::Error };

    let _ = ctx.store.update_document(document.id, document.version, |d| d.status = next_status);
}

/// Maps a §4.7's stage priority (1..5, smaller sooner) onto the queue
/// backend's four-bucket `JobPriority`. The domain `Job.priority` field
/// keeps the full integer range; only the infra dispatch queue compresses
/// it, since `JobPriority` was carried over from the teacher with four
/// discriminants rather than five — see DESIGN.md.
pub const fn queue_priority(priority: i32) -> archivus_queue::JobPriority {
    use archivus_queue::JobPriority::*;
    match priority {
        1 => Critical,
        2 => High,
        3 => Normal,
        _ => Low,
    }
}

/// The §4.7 vocabulary for a stage, matching each stage job's own
/// `JOB_TYPE` constant — what `POST /documents/upload`'s `queued_jobs` and
/// `GET /documents/{id}/jobs` report, rather than the domain `StageType`
/// enum's own (differently-cased) `Debug`/`Serialize` form.
pub const fn job_type_name(stage: StageType) -> &'static str {
    match stage {
        StageType::Extraction => "text_extraction",
        StageType::Ocr => "ocr",
        StageType::Summarization => "document_summarization",
        StageType::EntityExtraction => "entity_extraction",
        StageType::Classification => "document_classification",
        StageType::Tagging => "semantic_analysis",
        StageType::Embedding => "embedding_generation",
        StageType::FinancialExtraction => "financial_extraction",
        StageType::PreviewGeneration => "preview_generation",
    }
}
