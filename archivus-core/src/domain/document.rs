//! The `Document` entity, decomposed into a core record plus side tables per
//! the re-architecture note: `document_ai_result`, `document_financial`, and
//! `document_embedding` are written independently by the stage that owns
//! them, so two stages touching different side tables never conflict on the
//! core row's `(id, version)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    /// Status follows the lattice `pending -> processing -> {completed |
    /// error}`, with re-entry into `processing` only via explicit reprocess.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Error)
                | (Completed, Processing) // explicit reprocess
                | (Error, Processing) // explicit reprocess
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Receipt,
    Contract,
    Report,
    Correspondence,
    Other,
}

/// The core Document row. Everything an Intake Service write touches lives
/// here; everything a stage handler writes lives in a side table below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub folder_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    /// Hex-encoded SHA-256 of the stored bytes.
    pub content_hash: String,
    pub title: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter. Every mutating write must check this
    /// against the value it read and increment on success.
    pub version: u64,
}

impl Document {
    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Stage outputs that belong to the `document_ai_result` side table:
/// extraction, OCR, summarization, classification, tagging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentAiResult {
    pub document_id: Uuid,
    pub extracted_text: Option<String>,
    pub ocr_text: Option<String>,
    pub summary: Option<String>,
    pub extracted_entities: Option<serde_json::Value>,
    pub classification: Option<String>,
    pub tags: Vec<String>,
    /// 0..1
    pub confidence: Option<f32>,
    pub version: u64,
}

/// Amounts are scaled integers (minor units, e.g. cents) plus an explicit
/// ISO 4217 currency code — never a float.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFinancial {
    pub document_id: Uuid,
    pub amount_minor_units: Option<i64>,
    pub currency: Option<String>,
    pub tax_minor_units: Option<i64>,
    pub vendor: Option<String>,
    pub customer: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Embedding is optional; its absence never blocks the document from
/// reaching `completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentEmbedding {
    pub document_id: Uuid,
    pub vector: Option<Vec<f32>>,
    pub model: Option<String>,
    pub version: u64,
}

/// The read-side view that reassembles the core row with its side tables,
/// the shape returned by `GET /api/v1/documents/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub ai_result: Option<DocumentAiResult>,
    pub financial: Option<DocumentFinancial>,
    pub embedding: Option<DocumentEmbedding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lattice_allows_reprocess_but_not_skip() {
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Processing));
        assert!(DocumentStatus::Processing.can_transition_to(DocumentStatus::Completed));
        assert!(DocumentStatus::Completed.can_transition_to(DocumentStatus::Processing));
        assert!(!DocumentStatus::Pending.can_transition_to(DocumentStatus::Completed));
    }
}
