//! §4.1 Intake Service: turns a raw upload into a `Document` row, a stored
//! blob, and the initial stage-graph batch of jobs — the one write path
//! every other module in this crate exists to feed.

use archivus_blob::{BlobCtx, BlobPut};
use archivus_core::domain::{AuditAction, AuditLog, Document, DocumentAnalytics, DocumentStatus, DocumentType, StageType};
use archivus_core::{ArchivusError, ArchivusResult, TenantId};
use chrono::Utc;
use uuid::Uuid;

use crate::fingerprint;
use crate::stages::common::{is_financial_eligible, map_document_type};
use crate::context::PipelineContext;

/// The stage graph enqueued by step 7, in the order §8's S1 scenario
/// expects. `ocr`, `document_summarization`, and `embedding_generation` are
/// not part of this batch — `text_extraction`/`ocr` enqueue those themselves
/// once source text exists (§4.7.1/§4.7.2).
const INITIAL_STAGES: &[(StageType, i32)] = &[
    (StageType::Extraction, 5),
    (StageType::EntityExtraction, 4),
    (StageType::Classification, 3),
    (StageType::Tagging, 2),
    (StageType::FinancialExtraction, 3),
    (StageType::PreviewGeneration, 1),
];

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<Uuid>,
    pub document_type: Option<DocumentType>,
    pub tags: Vec<String>,
    pub skip_dedup: bool,
    /// §4.1's `enable-AI` input. `false` skips the entire initial stage
    /// graph — the upload still succeeds, the document just has nothing
    /// queued against it and stays `pending`.
    pub enable_ai: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            folder_id: None,
            document_type: None,
            tags: Vec::new(),
            skip_dedup: false,
            enable_ai: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub content_type: String,
    pub declared_size: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub document: Document,
    pub queued_job_ids: Vec<Uuid>,
}

pub struct IntakeService {
    context: PipelineContext,
}

impl IntakeService {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    /// §4.1's nine-step contract. Every early-exit path releases whatever
    /// quota reservation and stored blob it is holding before returning —
    /// the postcondition is that a failed upload leaves no trace.
    #[tracing::instrument(skip(self, payload), fields(tenant_id = %tenant_id, file_name = %payload.file_name))]
    pub async fn upload(
        &self,
        tenant_id: TenantId,
        actor_id: Uuid,
        payload: UploadPayload,
        options: UploadOptions,
    ) -> ArchivusResult<UploadResult> {
        let config = &self.context.config;

        // 1. Reserve declared size against the quota.
        let token = self.context.quota.reserve(tenant_id, payload.declared_size)?;

        // 2. Size and content-type validation.
        if let Err(err) = self.validate(&payload) {
            self.context.quota.release(token);
            return Err(err);
        }

        // 3. True byte count vs. declared size.
        if payload.bytes.len() as u64 > payload.declared_size {
            self.context.quota.release(token);
            return Err(ArchivusError::too_large(format!(
                "read {} bytes, which exceeds the declared size of {}",
                payload.bytes.len(),
                payload.declared_size
            )));
        }

        // 4. Dedup check.
        let content_hash = fingerprint::content_hash(&payload.bytes);
        if config.enable_duplicate_check() && !options.skip_dedup {
            if let Some(existing) = self.context.store.find_by_content_hash(tenant_id, &content_hash) {
                self.context.quota.release(token);
                return Err(ArchivusError::duplicate_exists(format!(
                    "document {} already has this content",
                    existing.id
                )));
            }
        }

        // 5. Auto-detect document type unless the caller supplied one.
        let document_type = options
            .document_type
            .unwrap_or_else(|| map_document_type(&auto_detect_hint(&payload.file_name)));

        // 6. Store the blob. Must succeed before the document row exists.
        let storage_path = match self.store_blob(tenant_id, &payload).await {
            Ok(path) => path,
            Err(err) => {
                self.context.quota.release(token);
                return Err(err);
            }
        };

        // 7. Document + analytics + job-graph, with the blob already durable.
        match self
            .finalize(tenant_id, actor_id, &payload, &options, document_type, &content_hash, &storage_path, token)
            .await
        {
            Ok(result) => {
                // 9. Non-blocking audit append.
                self.context.audit.record(
                    AuditLog::new(tenant_id, actor_id, result.document.id, "document", AuditAction::Create)
                        .with_details(serde_json::json!({ "file_name": payload.file_name })),
                );
                Ok(result)
            }
            Err(err) => {
                // 8. Compensation: best-effort blob delete, release reservation.
                self.delete_blob_best_effort(tenant_id, &storage_path).await;
                self.context.quota.release(token);
                Err(err)
            }
        }
    }

    fn validate(&self, payload: &UploadPayload) -> ArchivusResult<()> {
        let config = &self.context.config;
        if payload.declared_size > config.max_file_size() {
            return Err(ArchivusError::too_large(format!(
                "declared size {} exceeds the {} byte limit",
                payload.declared_size,
                config.max_file_size()
            )));
        }
        let allowed = config.allowed_content_types();
        if !allowed.is_empty() && !allowed.iter().any(|ct| ct == &payload.content_type) {
            return Err(ArchivusError::unsupported_format(format!(
                "content type '{}' is not accepted",
                payload.content_type
            )));
        }
        Ok(())
    }

    async fn store_blob(&self, tenant_id: TenantId, payload: &UploadPayload) -> ArchivusResult<String> {
        let blob_ctx = BlobCtx::new(tenant_id.0.to_string());
        let put = BlobPut::new()
            .with_content_type(payload.content_type.clone())
            .with_filename(payload.file_name.clone())
            .with_size_hint(payload.declared_size);
        let bytes = bytes::Bytes::from(payload.bytes.clone());
        let body: archivus_blob::ByteStream = Box::pin(futures_util::stream::once(async move { Ok(bytes) }));

        let receipt = self
            .context
            .blobs
            .put(blob_ctx, put, body)
            .await
            .map_err(|e| ArchivusError::storage_failure(e.to_string()))?;
        Ok(receipt.id.0)
    }

    async fn delete_blob_best_effort(&self, tenant_id: TenantId, storage_path: &str) {
        let blob_ctx = BlobCtx::new(tenant_id.0.to_string());
        let id = archivus_blob::BlobId::from_string(storage_path.to_string());
        if let Err(e) = self.context.blobs.delete(blob_ctx, id).await {
            tracing::warn!(%storage_path, error = %e, "compensation blob delete failed, leaving an orphaned blob");
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        tenant_id: TenantId,
        actor_id: Uuid,
        payload: &UploadPayload,
        options: &UploadOptions,
        document_type: DocumentType,
        content_hash: &str,
        storage_path: &str,
        token: crate::quota::ReservationToken,
    ) -> ArchivusResult<UploadResult> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            tenant_id,
            folder_id: options.folder_id,
            file_name: payload.file_name.clone(),
            content_type: payload.content_type.clone(),
            size_bytes: payload.declared_size,
            storage_path: storage_path.to_string(),
            content_hash: content_hash.to_string(),
            title: options.title.clone().unwrap_or_else(|| payload.file_name.clone()),
            document_type,
            status: DocumentStatus::Pending,
            created_by: actor_id,
            updated_by: actor_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 0,
        };

        self.context.store.insert_document(document.clone());
        self.context.quota.commit(token)?;
        self.context.store.insert_analytics(DocumentAnalytics::new(tenant_id, document.id));

        let mut document = document;
        let mut queued_job_ids = Vec::new();
        if options.enable_ai {
            queued_job_ids.reserve(INITIAL_STAGES.len());
            for (stage_type, priority) in INITIAL_STAGES {
                if *stage_type == StageType::FinancialExtraction && !is_financial_eligible(document.document_type) {
                    continue;
                }
                let job_id = self
                    .context
                    .dispatch
                    .enqueue_stage(tenant_id, document.id, *stage_type, *priority)
                    .await?;
                queued_job_ids.push(job_id);
            }

            if let Ok(updated) =
                self.context.store.update_document(document.id, document.version, |d| d.status = DocumentStatus::Processing)
            {
                document = updated;
            }
        }

        Ok(UploadResult { document, queued_job_ids })
    }
}

/// §4.1's auto-detect table: filename substring wins over extension.
fn auto_detect_hint(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    if lower.contains("invoice") {
        return "invoice".to_string();
    }
    if lower.contains("receipt") {
        return "receipt".to_string();
    }
    if lower.contains("contract") || lower.contains("agreement") {
        return "contract".to_string();
    }
    if lower.ends_with(".xlsx") || lower.ends_with(".xls") || lower.ends_with(".csv") {
        return "spreadsheet".to_string();
    }
    if lower.ends_with(".pptx") || lower.ends_with(".ppt") {
        return "presentation".to_string();
    }
    "general".to_string()
}
