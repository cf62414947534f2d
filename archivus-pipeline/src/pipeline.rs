//! Wires the nine stage jobs onto a [`QueueAdapter`] and gives the rest of
//! the crate a single [`Dispatcher`] for turning a `(tenant, document,
//! stage)` triple into a domain `Job` row plus an enqueued message.

use std::collections::HashMap;
use std::sync::Arc;

use archivus_ai::AiAdapter;
use archivus_blob::BlobAdapter;
use archivus_core::domain::{Job as DomainJob, StageType};
use archivus_core::{ArchivusError, ArchivusResult, ConfigSnapshot, TenantId};
use archivus_queue::backend::memory::MemoryBackend;
use archivus_queue::{QueueAdapter, QueueConfig, WorkerHandle};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use uuid::Uuid;

use crate::context::{queue_ctx_for, PipelineContext};
use crate::stages::classification::ClassificationJob;
use crate::stages::embedding::EmbeddingJob;
use crate::stages::entity_extraction::EntityExtractionJob;
use crate::stages::financial_extraction::FinancialExtractionJob;
use crate::stages::ocr::OcrJob;
use crate::stages::preview_generation::PreviewGenerationJob;
use crate::stages::summarization::SummarizationJob;
use crate::stages::tagging::TaggingJob;
use crate::stages::text_extraction::TextExtractionJob;
use crate::store::InMemoryStore;

const DEFAULT_QUEUE: &str = "default";

/// Dispatches stage jobs onto the queue and keeps the domain `Job` read
/// model (§6.2) in sync with what's actually enqueued.
///
/// `MemoryBackend` partitions its queues by `QueueCtx::tenant_id`, and
/// `QueueAdapter::start_workers` binds a single fixed `QueueCtx` for the life
/// of the worker pool it returns — there is no "dequeue across all tenants"
/// mode. So a single worker pool started once at boot would only ever see
/// one tenant's jobs. The Dispatcher instead starts one worker pool per
/// tenant, lazily, the first time that tenant has a stage enqueued.
#[derive(Clone)]
pub struct Dispatcher {
    adapter: Arc<QueueAdapter<MemoryBackend>>,
    store: InMemoryStore,
    context: Arc<OnceCell<PipelineContext>>,
    workers: Arc<AsyncMutex<HashMap<String, WorkerHandle>>>,
}

impl Dispatcher {
    fn new(adapter: Arc<QueueAdapter<MemoryBackend>>, store: InMemoryStore) -> Self {
        Self {
            adapter,
            store,
            context: Arc::new(OnceCell::new()),
            workers: Arc::new(AsyncMutex::new(HashMap::new())),
        }
    }

    /// Completes the construction cycle: `Dispatcher` is built before
    /// `PipelineContext` (which embeds it), so the context it needs to start
    /// workers against is handed back once `PipelineContext::new` returns.
    fn bind_context(&self, context: PipelineContext) {
        let _ = self.context.set(context);
    }

    /// Starts this tenant's worker pool the first time it's needed. A no-op
    /// once that pool exists.
    async fn ensure_worker_pool(&self, tenant_str: &str) -> ArchivusResult<()> {
        let mut workers = self.workers.lock().await;
        if workers.contains_key(tenant_str) {
            return Ok(());
        }

        let context = self
            .context
            .get()
            .cloned()
            .ok_or_else(|| ArchivusError::internal("dispatcher used before pipeline startup completed"))?;
        let ctx = archivus_queue::QueueCtx::new(tenant_str.to_string());
        let handle = self
            .adapter
            .start_workers(ctx, context, vec![DEFAULT_QUEUE.to_string()])
            .await
            .map_err(|e| ArchivusError::internal(format!("failed to start worker pool for tenant {tenant_str}: {e}")))?;

        workers.insert(tenant_str.to_string(), handle);
        Ok(())
    }

    /// Inserts the domain job row and enqueues the matching stage job.
    /// Returns the domain job id so the Intake Service and stage follow-ups
    /// can return it to a caller or log it.
    pub async fn enqueue_stage(
        &self,
        tenant_id: TenantId,
        document_id: Uuid,
        stage_type: StageType,
        priority: i32,
    ) -> ArchivusResult<Uuid> {
        let tenant_str = tenant_id.0.to_string();
        self.ensure_worker_pool(&tenant_str).await?;

        let job = DomainJob::new(tenant_id, document_id, stage_type, priority);
        self.store.insert_job(job.clone());

        let queue_ctx = queue_ctx_for(tenant_id);
        let job_id = job.id;

        let enqueue_result = match stage_type {
            StageType::Extraction => {
                self.adapter
                    .enqueue(queue_ctx, TextExtractionJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::Ocr => {
                self.adapter
                    .enqueue(queue_ctx, OcrJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::Summarization => {
                self.adapter
                    .enqueue(queue_ctx, SummarizationJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::EntityExtraction => {
                self.adapter
                    .enqueue(queue_ctx, EntityExtractionJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::Classification => {
                self.adapter
                    .enqueue(queue_ctx, ClassificationJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::Tagging => {
                self.adapter
                    .enqueue(queue_ctx, TaggingJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::Embedding => {
                self.adapter
                    .enqueue(queue_ctx, EmbeddingJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::FinancialExtraction => {
                self.adapter
                    .enqueue(queue_ctx, FinancialExtractionJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
            StageType::PreviewGeneration => {
                self.adapter
                    .enqueue(queue_ctx, PreviewGenerationJob { job_id, document_id, tenant_id: tenant_str })
                    .await
                    .map(|_| ())
            }
        };

        enqueue_result.map_err(|e| ArchivusError::transient_upstream(format!("enqueue failed: {e}")))?;
        Ok(job_id)
    }
}

/// Owns the queue adapter and the [`PipelineContext`] every stage job runs
/// against. Worker pools are started per tenant by `context.dispatch` as
/// tenants show up, rather than all at once here.
pub struct Pipeline {
    pub context: PipelineContext,
    adapter: Arc<QueueAdapter<MemoryBackend>>,
}

impl Pipeline {
    /// Registers all nine stage jobs and returns a [`Pipeline`] ready for the
    /// Intake Service to enqueue work against via `context.dispatch`.
    pub async fn start(
        store: InMemoryStore,
        blobs: Arc<BlobAdapter>,
        ai: Arc<AiAdapter>,
        config: ConfigSnapshot,
    ) -> ArchivusResult<Self> {
        let mut queue_config = QueueConfig::default();
        queue_config.max_workers = config.max_concurrent_jobs();

        let adapter = Arc::new(QueueAdapter::with_config(MemoryBackend::new(), queue_config));
        Self::register_all(&adapter)
            .await
            .map_err(|e| ArchivusError::internal(format!("failed to register stage jobs: {e}")))?;

        let dispatch = Dispatcher::new(adapter.clone(), store.clone());
        let context = PipelineContext::new(store, blobs, ai, config, dispatch.clone());
        dispatch.bind_context(context.clone());

        Ok(Self { context, adapter })
    }

    async fn register_all(adapter: &QueueAdapter<MemoryBackend>) -> archivus_queue::QueueResult<()> {
        adapter.register_job::<TextExtractionJob>().await?;
        adapter.register_job::<OcrJob>().await?;
        adapter.register_job::<SummarizationJob>().await?;
        adapter.register_job::<EntityExtractionJob>().await?;
        adapter.register_job::<ClassificationJob>().await?;
        adapter.register_job::<TaggingJob>().await?;
        adapter.register_job::<EmbeddingJob>().await?;
        adapter.register_job::<FinancialExtractionJob>().await?;
        adapter.register_job::<PreviewGenerationJob>().await?;
        Ok(())
    }

    pub fn adapter(&self) -> &Arc<QueueAdapter<MemoryBackend>> {
        &self.adapter
    }
}
