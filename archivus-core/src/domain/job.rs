use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

/// The nine stage types in the processing graph, §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Extraction,
    Ocr,
    Summarization,
    EntityExtraction,
    Classification,
    Tagging,
    Embedding,
    FinancialExtraction,
    PreviewGeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

/// A unit of stage work against a document. Priority: smaller int is sooner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub document_id: Uuid,
    pub stage_type: StageType,
    pub priority: i32,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub scheduled_not_before: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
    /// Set while `status == InProgress`; the lease expiry a worker must
    /// renew or the dispatcher reaps.
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(tenant_id: TenantId, document_id: Uuid, stage_type: StageType, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            document_id,
            stage_type,
            priority,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: 3,
            scheduled_not_before: Utc::now(),
            started_at: None,
            completed_at: None,
            processing_time_ms: None,
            error_message: None,
            result: None,
            lease_expires_at: None,
        }
    }

    /// A failed job with `attempts < max_attempts` returns to `queued` with
    /// exponential delay rather than terminating.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}
