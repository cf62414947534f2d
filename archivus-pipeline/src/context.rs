//! The shared context every stage handler receives. `archivus_queue`
//! requires every `Job::Context` registered on a single `start_workers` call
//! to be the exact same concrete type passed as that call's `context`
//! argument (it wraps that value in one `Arc` internally and downcasts
//! against it); all nine stage jobs therefore declare
//! `type Context = PipelineContext` and this struct holds its own
//! collaborators behind `Arc`/cheap-`Clone` wrappers so cloning it per
//! dispatch is inexpensive.

use std::sync::Arc;

use archivus_ai::AiAdapter;
use archivus_blob::BlobAdapter;
use archivus_core::{ArchivusResult, ConfigSnapshot, TenantId};
use archivus_queue::QueueCtx;
use uuid::Uuid;

use crate::analytics::AnalyticsHooks;
use crate::audit::AuditRecorder;
use crate::pipeline::Dispatcher;
use crate::quota::QuotaManager;
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct PipelineContext {
    pub store: InMemoryStore,
    pub blobs: Arc<BlobAdapter>,
    pub ai: Arc<AiAdapter>,
    pub quota: QuotaManager,
    pub audit: AuditRecorder,
    pub analytics: AnalyticsHooks,
    pub config: ConfigSnapshot,
    /// Lets a stage handler enqueue a follow-up stage (§4.7.1's "otherwise
    /// enqueue ocr instead", and text_extraction's summarization/embedding
    /// follow-ups) without every handler knowing about every other stage's
    /// job type.
    pub dispatch: Dispatcher,
}

impl PipelineContext {
    pub fn new(
        store: InMemoryStore,
        blobs: Arc<BlobAdapter>,
        ai: Arc<AiAdapter>,
        config: ConfigSnapshot,
        dispatch: Dispatcher,
    ) -> Self {
        let quota = QuotaManager::new(store.clone());
        let audit = AuditRecorder::spawn(store.clone());
        let analytics = AnalyticsHooks::spawn(store.clone());
        Self { store, blobs, ai, quota, audit, analytics, config, dispatch }
    }
}

/// `archivus-queue`'s `QueueCtx::tenant_id` is a plain `String` (it has no
/// notion of the domain `TenantId` newtype); stage jobs carry the tenant as a
/// string in their payload and parse it back into a `TenantId` at the point
/// they touch the store.
pub fn parse_tenant_id(raw: &str) -> ArchivusResult<TenantId> {
    raw.parse::<Uuid>()
        .map(TenantId)
        .map_err(|e| archivus_core::ArchivusError::invalid_input(format!("malformed tenant id '{raw}': {e}")))
}

pub fn queue_ctx_for(tenant_id: TenantId) -> QueueCtx {
    QueueCtx::new(tenant_id.0.to_string())
}
