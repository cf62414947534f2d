//! In-memory persistence for the pipeline's entities. Stands in for the
//! relational adapter the design treats as an external collaborator;
//! `InMemoryStore` is what the rest of this crate and its tests run
//! against, following the `Arc<RwLock<HashMap<...>>>` pattern used
//! throughout the corpus for in-memory backends.

use std::collections::HashMap;
use std::sync::Arc;

use archivus_core::domain::{
    AuditLog, Document, DocumentAiResult, DocumentAnalytics, DocumentEmbedding, DocumentFinancial,
    DocumentView, Job, Tenant,
};
use archivus_core::{ArchivusError, ArchivusResult, TenantId};
use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    documents: HashMap<Uuid, Document>,
    ai_results: HashMap<Uuid, DocumentAiResult>,
    financials: HashMap<Uuid, DocumentFinancial>,
    embeddings: HashMap<Uuid, DocumentEmbedding>,
    jobs: HashMap<Uuid, Job>,
    audit_log: Vec<AuditLog>,
    analytics: HashMap<Uuid, DocumentAnalytics>,
    /// Preview artifact storage path per document, §4.7.9. Not part of the
    /// core `Document` row or a domain side table since nothing outside the
    /// preview_generation stage and the `GET /documents/{id}/preview`
    /// endpoint ever reads it.
    previews: HashMap<Uuid, String>,
}

/// Tenant-scoped, in-memory store for every entity in §3. A real deployment
/// swaps this for a transactional relational adapter without any of the
/// intake/dispatch/stage code above it changing shape.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Tenant ----

    pub fn create_tenant(&self, tenant: Tenant) {
        self.tables.write().tenants.insert(tenant.id, tenant);
    }

    pub fn get_tenant(&self, tenant_id: TenantId) -> ArchivusResult<Tenant> {
        self.tables
            .read()
            .tenants
            .get(&tenant_id)
            .cloned()
            .ok_or_else(|| ArchivusError::not_found(format!("tenant {tenant_id} not found")))
    }

    /// Applies `mutate` to the tenant row under the table lock. Used for
    /// quota reserve/commit/release and `api_used` bumps, which must be
    /// atomic single-row read-modify-writes.
    pub fn mutate_tenant<F>(&self, tenant_id: TenantId, mutate: F) -> ArchivusResult<Tenant>
    where
        F: FnOnce(&mut Tenant),
    {
        let mut tables = self.tables.write();
        let tenant = tables
            .tenants
            .get_mut(&tenant_id)
            .ok_or_else(|| ArchivusError::not_found(format!("tenant {tenant_id} not found")))?;
        mutate(tenant);
        Ok(tenant.clone())
    }

    // ---- Document core row ----

    /// A document with `(tenant_id, content_hash)` matching an existing
    /// non-soft-deleted row, if any — the dedup check in the Intake
    /// Service's step 4.
    pub fn find_by_content_hash(&self, tenant_id: TenantId, content_hash: &str) -> Option<Document> {
        self.tables
            .read()
            .documents
            .values()
            .find(|doc| doc.tenant_id == tenant_id && doc.content_hash == content_hash && !doc.is_soft_deleted())
            .cloned()
    }

    pub fn insert_document(&self, document: Document) {
        self.tables.write().documents.insert(document.id, document);
    }

    /// Returns `None` rather than a tenancy error on mismatch — callers (the
    /// HTTP layer in particular) must turn a tenant mismatch into 404, never
    /// 403, to avoid existence disclosure.
    pub fn get_document(&self, tenant_id: TenantId, document_id: Uuid) -> Option<Document> {
        self.tables
            .read()
            .documents
            .get(&document_id)
            .filter(|doc| doc.tenant_id == tenant_id)
            .cloned()
    }

    /// Document lookup ignoring tenant scope, for stage handlers that
    /// already trust the `tenant_id` embedded in the job payload.
    pub fn get_document_unscoped(&self, document_id: Uuid) -> Option<Document> {
        self.tables.read().documents.get(&document_id).cloned()
    }

    /// Optimistic-concurrency update: `mutate` only runs if the stored
    /// `version` still matches `expected_version`; on success the version is
    /// incremented. A losing writer gets `ArchivusError::persistence_failure`
    /// (retryable) and is expected to re-read and retry.
    pub fn update_document<F>(&self, document_id: Uuid, expected_version: u64, mutate: F) -> ArchivusResult<Document>
    where
        F: FnOnce(&mut Document),
    {
        let mut tables = self.tables.write();
        let document = tables
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| ArchivusError::not_found(format!("document {document_id} not found")))?;

        if document.is_soft_deleted() {
            return Err(ArchivusError::cancelled("document is soft-deleted"));
        }
        if document.version != expected_version {
            return Err(ArchivusError::persistence_failure("version conflict, retry with a fresh read"));
        }
        mutate(document);
        document.version += 1;
        Ok(document.clone())
    }

    // ---- Side tables ----

    pub fn get_ai_result(&self, document_id: Uuid) -> Option<DocumentAiResult> {
        self.tables.read().ai_results.get(&document_id).cloned()
    }

    pub fn upsert_ai_result<F>(&self, document_id: Uuid, mutate: F)
    where
        F: FnOnce(&mut DocumentAiResult),
    {
        let mut tables = self.tables.write();
        let row = tables.ai_results.entry(document_id).or_insert_with(|| DocumentAiResult {
            document_id,
            ..Default::default()
        });
        mutate(row);
        row.version += 1;
    }

    pub fn get_financial(&self, document_id: Uuid) -> Option<DocumentFinancial> {
        self.tables.read().financials.get(&document_id).cloned()
    }

    pub fn upsert_financial<F>(&self, document_id: Uuid, mutate: F)
    where
        F: FnOnce(&mut DocumentFinancial),
    {
        let mut tables = self.tables.write();
        let row = tables.financials.entry(document_id).or_insert_with(|| DocumentFinancial {
            document_id,
            ..Default::default()
        });
        mutate(row);
        row.version += 1;
    }

    pub fn get_embedding(&self, document_id: Uuid) -> Option<DocumentEmbedding> {
        self.tables.read().embeddings.get(&document_id).cloned()
    }

    pub fn upsert_embedding<F>(&self, document_id: Uuid, mutate: F)
    where
        F: FnOnce(&mut DocumentEmbedding),
    {
        let mut tables = self.tables.write();
        let row = tables.embeddings.entry(document_id).or_insert_with(|| DocumentEmbedding {
            document_id,
            ..Default::default()
        });
        mutate(row);
        row.version += 1;
    }

    /// The read-side view assembling the core row with its side tables, per
    /// the re-architecture note in §3.
    pub fn document_view(&self, tenant_id: TenantId, document_id: Uuid) -> Option<DocumentView> {
        let document = self.get_document(tenant_id, document_id)?;
        Some(DocumentView {
            ai_result: self.get_ai_result(document.id),
            financial: self.get_financial(document.id),
            embedding: self.get_embedding(document.id),
            document,
        })
    }

    // ---- Job (domain) rows, §6.2 ----

    pub fn insert_job(&self, job: Job) {
        self.tables.write().jobs.insert(job.id, job);
    }

    pub fn get_job(&self, job_id: Uuid) -> Option<Job> {
        self.tables.read().jobs.get(&job_id).cloned()
    }

    pub fn update_job<F>(&self, job_id: Uuid, mutate: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut tables = self.tables.write();
        let job = tables.jobs.get_mut(&job_id)?;
        mutate(job);
        Some(job.clone())
    }

    pub fn jobs_for_document(&self, document_id: Uuid) -> Vec<Job> {
        self.tables
            .read()
            .jobs
            .values()
            .filter(|job| job.document_id == document_id)
            .cloned()
            .collect()
    }

    // ---- Audit & analytics ----

    pub fn append_audit(&self, entry: AuditLog) {
        self.tables.write().audit_log.push(entry);
    }

    pub fn audit_log_for(&self, resource_id: Uuid) -> Vec<AuditLog> {
        self.tables
            .read()
            .audit_log
            .iter()
            .filter(|entry| entry.resource_id == resource_id)
            .cloned()
            .collect()
    }

    pub fn insert_analytics(&self, analytics: DocumentAnalytics) {
        self.tables.write().analytics.insert(analytics.document_id, analytics);
    }

    pub fn bump_analytics<F>(&self, document_id: Uuid, mutate: F)
    where
        F: FnOnce(&mut DocumentAnalytics),
    {
        if let Some(row) = self.tables.write().analytics.get_mut(&document_id) {
            mutate(row);
        }
    }

    pub fn get_analytics(&self, document_id: Uuid) -> Option<DocumentAnalytics> {
        self.tables.read().analytics.get(&document_id).cloned()
    }

    // ---- Preview artifacts ----

    pub fn set_preview_path(&self, document_id: Uuid, path: String) {
        self.tables.write().previews.insert(document_id, path);
    }

    pub fn get_preview_path(&self, document_id: Uuid) -> Option<String> {
        self.tables.read().previews.get(&document_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivus_core::domain::SubscriptionTier;
    use uuid::Uuid;

    #[test]
    fn optimistic_write_rejects_stale_version() {
        let store = InMemoryStore::new();
        let tenant = Tenant::new("acme", SubscriptionTier::Starter);
        let document = Document {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            folder_id: None,
            file_name: "invoice.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 1024,
            storage_path: "acme/2026/01/doc-1".to_string(),
            content_hash: "abc123".to_string(),
            title: "invoice".to_string(),
            document_type: archivus_core::domain::DocumentType::Invoice,
            status: archivus_core::domain::DocumentStatus::Pending,
            created_by: Uuid::new_v4(),
            updated_by: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
            version: 0,
        };
        let document_id = document.id;
        store.insert_document(document);

        store.update_document(document_id, 0, |d| d.status = archivus_core::domain::DocumentStatus::Processing).unwrap();

        let result = store.update_document(document_id, 0, |d| d.status = archivus_core::domain::DocumentStatus::Completed);
        assert!(result.is_err());
    }

    #[test]
    fn dedup_lookup_ignores_soft_deleted_documents() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let mut document = Document {
            id: Uuid::new_v4(),
            tenant_id,
            folder_id: None,
            file_name: "a.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 10,
            storage_path: "x".to_string(),
            content_hash: "hash1".to_string(),
            title: "a".to_string(),
            document_type: archivus_core::domain::DocumentType::Other,
            status: archivus_core::domain::DocumentStatus::Completed,
            created_by: Uuid::new_v4(),
            updated_by: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: Some(chrono::Utc::now()),
            version: 0,
        };
        store.insert_document(document.clone());
        assert!(store.find_by_content_hash(tenant_id, "hash1").is_none());

        document.deleted_at = None;
        document.id = Uuid::new_v4();
        store.insert_document(document);
        assert!(store.find_by_content_hash(tenant_id, "hash1").is_some());
    }
}
