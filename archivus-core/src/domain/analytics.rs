use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

/// Counters only; increments must be atomic (callers use `fetch_add` or an
/// equivalent, never read-modify-write across an await point).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalytics {
    pub tenant_id: TenantId,
    pub document_id: Uuid,
    pub view_count: u64,
    pub download_count: u64,
    pub share_count: u64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

impl DocumentAnalytics {
    pub fn new(tenant_id: TenantId, document_id: Uuid) -> Self {
        Self {
            tenant_id,
            document_id,
            view_count: 0,
            download_count: 0,
            share_count: 0,
            last_viewed_at: None,
        }
    }
}
