//! End-to-end scenarios against the public `IntakeService`/`Pipeline` API,
//! one per concrete case in the design notes' scenario list.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archivus_ai::{AiAdapter, AiAdapterConfig, AiCapabilities, AiError, AiProvider, AiResult, DeterministicProvider, TokenUsage};
use archivus_blob::{BlobAdapter, BlobConfig, InMemoryBlobStore};
use archivus_core::domain::{
    Document, DocumentStatus, DocumentType, Job as DomainJob, StageType, SubscriptionTier, Tenant,
};
use archivus_core::{Config, ErrorKind, TenantId};
use archivus_pipeline::pipeline::Pipeline;
use archivus_pipeline::stages::common;
use archivus_pipeline::stages::text_extraction::TextExtractionJob;
use archivus_pipeline::{IntakeService, UploadOptions, UploadPayload};
use archivus_queue::backend::memory::MemoryBackend;
use archivus_queue::{Job, QueueAdapter, QueueBackend, QueueCtx};
use async_trait::async_trait;
use uuid::Uuid;

fn starter_tenant(name: &str) -> Tenant {
    let mut tenant = Tenant::new(name, SubscriptionTier::Starter);
    tenant.storage_quota_bytes = 5 * 1024 * 1024 * 1024;
    tenant.api_quota_period = 1_000;
    tenant
}

async fn test_pipeline_with_ai(tenant: Tenant, ai: AiAdapter) -> (Pipeline, TenantId) {
    let store = archivus_pipeline::InMemoryStore::new();
    let tenant_id = tenant.id;
    store.create_tenant(tenant);

    let mut config = Config::new();
    config.set("max_file_size", "10485760");
    let snapshot = config.snapshot();

    let blobs = Arc::new(BlobAdapter::new(InMemoryBlobStore::new(), BlobConfig::default()));
    let pipeline = Pipeline::start(store, blobs, Arc::new(ai), snapshot).await.unwrap();
    (pipeline, tenant_id)
}

async fn test_pipeline(tenant: Tenant) -> (Pipeline, TenantId) {
    let store = archivus_pipeline::InMemoryStore::new();
    let mut config = Config::new();
    config.set("max_file_size", "10485760");
    let snapshot = config.snapshot();
    let ai = AiAdapter::new(DeterministicProvider::new(), AiAdapterConfig::from_snapshot(&snapshot));
    test_pipeline_with_ai(tenant, ai).await
}

/// S1. Happy-path upload of an invoice enqueues exactly the six stages of
/// the initial batch, in order, and promotes storage_used by the upload
/// size.
#[tokio::test]
async fn s1_happy_path_upload() {
    let (pipeline, tenant_id) = test_pipeline(starter_tenant("acme")).await;
    let intake = IntakeService::new(pipeline.context.clone());

    let bytes = vec![0u8; 245_760];
    let payload = UploadPayload {
        file_name: "invoice.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        declared_size: bytes.len() as u64,
        bytes,
    };

    let result = intake.upload(tenant_id, Uuid::new_v4(), payload, UploadOptions::default()).await.unwrap();

    assert_eq!(result.document.status, DocumentStatus::Processing);
    assert_eq!(result.document.document_type, DocumentType::Invoice);
    assert!(!result.document.content_hash.is_empty());
    assert_eq!(result.queued_job_ids.len(), 6);

    let stage_types: Vec<StageType> = result
        .queued_job_ids
        .iter()
        .map(|id| pipeline.context.store.get_job(*id).unwrap().stage_type)
        .collect();
    assert_eq!(
        stage_types,
        vec![
            StageType::Extraction,
            StageType::EntityExtraction,
            StageType::Classification,
            StageType::Tagging,
            StageType::FinancialExtraction,
            StageType::PreviewGeneration,
        ]
    );

    let tenant = pipeline.context.store.get_tenant(tenant_id).unwrap();
    assert_eq!(tenant.storage_used_bytes, 245_760);
}

/// S2. Re-uploading identical bytes with default options is rejected as a
/// duplicate and leaves storage_used untouched.
#[tokio::test]
async fn s2_duplicate_rejection() {
    let (pipeline, tenant_id) = test_pipeline(starter_tenant("acme")).await;
    let intake = IntakeService::new(pipeline.context.clone());

    let bytes = vec![9u8; 4_096];
    let payload = || UploadPayload {
        file_name: "statement.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        declared_size: bytes.len() as u64,
        bytes: bytes.clone(),
    };

    intake.upload(tenant_id, Uuid::new_v4(), payload(), UploadOptions::default()).await.unwrap();
    let used_after_first = pipeline.context.store.get_tenant(tenant_id).unwrap().storage_used_bytes;

    let err = intake.upload(tenant_id, Uuid::new_v4(), payload(), UploadOptions::default()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateExists);

    let used_after_second = pipeline.context.store.get_tenant(tenant_id).unwrap().storage_used_bytes;
    assert_eq!(used_after_first, used_after_second);
}

/// S3. An upload that would push storage_used past the tenant's quota is
/// rejected and the reservation is released rather than left dangling.
#[tokio::test]
async fn s3_quota_boundary() {
    let mut tenant = starter_tenant("acme");
    let quota = 5 * 1024 * 1024 * 1024u64;
    tenant.storage_quota_bytes = quota;
    tenant.storage_used_bytes = quota - 1024;
    let (pipeline, tenant_id) = test_pipeline(tenant).await;
    let intake = IntakeService::new(pipeline.context.clone());

    let payload = UploadPayload {
        file_name: "oversized.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        declared_size: 2048,
        bytes: vec![1u8; 2048],
    };

    let err = intake.upload(tenant_id, Uuid::new_v4(), payload, UploadOptions::default()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);

    let tenant = pipeline.context.store.get_tenant(tenant_id).unwrap();
    assert_eq!(tenant.storage_used_bytes, quota - 1024);
}

/// A provider whose `generate_summary` fails once with a retryable upstream
/// error and succeeds on every subsequent call — everything else delegates
/// to `DeterministicProvider`.
struct FlakySummaryProvider {
    inner: DeterministicProvider,
    failures_remaining: AtomicU32,
}

impl FlakySummaryProvider {
    fn new(failures: u32) -> Self {
        Self { inner: DeterministicProvider::new(), failures_remaining: AtomicU32::new(failures) }
    }
}

#[async_trait]
impl AiProvider for FlakySummaryProvider {
    fn capabilities(&self) -> AiCapabilities {
        self.inner.capabilities()
    }
    async fn extract_text(&self, text: &str) -> AiResult<(String, TokenUsage)> {
        self.inner.extract_text(text).await
    }
    async fn generate_embedding(&self, text: &str) -> AiResult<(Vec<f32>, TokenUsage)> {
        self.inner.generate_embedding(text).await
    }
    async fn generate_summary(&self, text: &str) -> AiResult<(String, TokenUsage)> {
        if self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None }).is_ok() {
            return Err(AiError::Upstream("503 service unavailable".to_string()));
        }
        self.inner.generate_summary(text).await
    }
    async fn extract_entities(&self, text: &str) -> AiResult<(archivus_ai::ExtractedEntities, TokenUsage)> {
        self.inner.extract_entities(text).await
    }
    async fn classify_document(&self, text: &str) -> AiResult<(archivus_ai::ClassificationResult, TokenUsage)> {
        self.inner.classify_document(text).await
    }
    async fn generate_tags(&self, text: &str) -> AiResult<(Vec<String>, TokenUsage)> {
        self.inner.generate_tags(text).await
    }
    async fn extract_financial_data(&self, text: &str, doc_type: &str) -> AiResult<(archivus_ai::FinancialData, TokenUsage)> {
        self.inner.extract_financial_data(text, doc_type).await
    }
    async fn perform_ocr(&self, blob_path: &str) -> AiResult<(String, TokenUsage)> {
        self.inner.perform_ocr(blob_path).await
    }
}

/// S4. Summarization's first attempt returns a transient upstream error;
/// the queue retries it with backoff and the second attempt succeeds, so
/// the document ends up with a populated summary despite the blip.
///
/// `retry_attempts: 0` on the AI adapter config keeps its own internal
/// retry out of the way, so the failure actually reaches the queue's
/// retry path rather than being swallowed before the stage handler sees it.
#[tokio::test]
async fn s4_transient_ai_failure_then_success() {
    let ai_config = AiAdapterConfig { retry_attempts: 0, ..Default::default() };
    let ai = AiAdapter::new(FlakySummaryProvider::new(1), ai_config);
    let (pipeline, tenant_id) = test_pipeline_with_ai(starter_tenant("acme"), ai).await;
    let intake = IntakeService::new(pipeline.context.clone());

    let payload = UploadPayload {
        file_name: "letter.txt".to_string(),
        content_type: "text/plain".to_string(),
        declared_size: 64,
        bytes: b"Dear Acme, this is a short business letter about invoice terms.".to_vec(),
    };

    let result = intake.upload(tenant_id, Uuid::new_v4(), payload, UploadOptions::default()).await.unwrap();
    let document_id = result.document.id;

    // text_extraction enqueues document_summarization as a follow-up once it
    // lands; poll for that job to appear and then run to completion.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let summarization_job = loop {
        let jobs = pipeline.context.store.jobs_for_document(document_id);
        if let Some(job) = jobs.into_iter().find(|j| j.stage_type == StageType::Summarization) {
            break job;
        }
        assert!(tokio::time::Instant::now() < deadline, "summarization job never got enqueued");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = pipeline.context.store.get_job(summarization_job.id).unwrap();
        if job.status == archivus_core::domain::JobStatus::Completed {
            assert_eq!(job.attempts, 2, "one failed attempt plus the successful retry");
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "summarization job never completed");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let ai_result = pipeline.context.store.get_ai_result(document_id).unwrap();
    assert!(ai_result.summary.is_some());
}

/// S5. A document lookup scoped to the wrong tenant returns nothing,
/// exactly like a nonexistent document would — existence is never
/// disclosed across a tenant boundary.
#[tokio::test]
async fn s5_cross_tenant_isolation() {
    let (pipeline, tenant_a) = test_pipeline(starter_tenant("acme")).await;
    pipeline.context.store.create_tenant(starter_tenant("globex"));
    let tenant_b = TenantId::new();

    let intake = IntakeService::new(pipeline.context.clone());
    let payload = UploadPayload {
        file_name: "confidential.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        declared_size: 16,
        bytes: vec![0u8; 16],
    };
    let result = intake.upload(tenant_a, Uuid::new_v4(), payload, UploadOptions::default()).await.unwrap();

    assert!(pipeline.context.store.get_document(tenant_a, result.document.id).is_some());
    assert!(pipeline.context.store.get_document(tenant_b, result.document.id).is_none());
}

/// S6. A worker that leases a job and crashes before completing it leaves
/// that job reclaimable: a lease-expiry sweep returns it to the queue with
/// `attempts` incremented, a second worker can pick it back up, and running
/// it to completion from there yields the same terminal state a clean
/// single-attempt run would.
#[tokio::test]
async fn s6_lease_expiry_reclaims_and_completes() {
    let (pipeline, tenant_id) = test_pipeline(starter_tenant("acme")).await;
    let tenant_str = tenant_id.0.to_string();

    // A document that routes straight to `ocr` without touching blob
    // storage, so this test can stay focused on queue/job bookkeeping.
    let now = chrono::Utc::now();
    let document = Document {
        id: Uuid::new_v4(),
        tenant_id,
        folder_id: None,
        file_name: "scan.png".to_string(),
        content_type: "image/png".to_string(),
        size_bytes: 10,
        storage_path: "unused".to_string(),
        content_hash: "deadbeef".to_string(),
        title: "scan".to_string(),
        document_type: DocumentType::Other,
        status: DocumentStatus::Processing,
        created_by: Uuid::new_v4(),
        updated_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        version: 0,
    };
    pipeline.context.store.insert_document(document.clone());

    let domain_job = DomainJob::new(tenant_id, document.id, StageType::Extraction, 5);
    let domain_job_id = domain_job.id;
    pipeline.context.store.insert_job(domain_job);

    // A standalone adapter/backend, independent of the pipeline's own
    // per-tenant worker pools, so this test controls leasing by hand.
    let test_adapter = QueueAdapter::new(MemoryBackend::new());
    test_adapter.register_job::<TextExtractionJob>().await.unwrap();
    let queue_ctx = QueueCtx::new(tenant_str.clone());
    let job = TextExtractionJob { job_id: domain_job_id, document_id: document.id, tenant_id: tenant_str };

    test_adapter.enqueue(queue_ctx.clone(), job.clone()).await.unwrap();
    let first_lease = test_adapter.backend().dequeue(queue_ctx.clone(), &["default"]).await.unwrap().unwrap();
    assert_eq!(first_lease.record.attempt, 1);

    // Simulate the worker starting the job, then crashing before it finishes.
    common::begin(&pipeline.context, domain_job_id);
    let crashed = pipeline.context.store.get_job(domain_job_id).unwrap();
    assert_eq!(crashed.attempts, 1);
    assert_eq!(crashed.status, archivus_core::domain::JobStatus::InProgress);

    test_adapter.backend().force_lease_expiry(first_lease.record.job_id.clone()).await.unwrap();
    test_adapter.backend().run_reaper_tick().await.unwrap();

    let second_lease = test_adapter.backend().dequeue(queue_ctx, &["default"]).await.unwrap().unwrap();
    assert_eq!(second_lease.record.attempt, 2, "lease expiry bumps the queue-side attempt counter");

    // A second worker picks the job back up and runs it to completion.
    let outcome = job.execute(pipeline.context.clone()).await;
    assert!(outcome.is_ok());

    let finished = pipeline.context.store.get_job(domain_job_id).unwrap();
    assert_eq!(finished.attempts, 2);
    assert_eq!(finished.status, archivus_core::domain::JobStatus::Completed);
}
