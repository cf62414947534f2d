use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Approve,
}

/// Append-only. No mutation after append — there is no `update`/`delete`
/// method on this type on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub actor_user_id: Uuid,
    pub resource_id: Uuid,
    pub resource_type: String,
    pub action: AuditAction,
    pub details: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        tenant_id: TenantId,
        actor_user_id: Uuid,
        resource_id: Uuid,
        resource_type: impl Into<String>,
        action: AuditAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            actor_user_id,
            resource_id,
            resource_type: resource_type.into(),
            action,
            details: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
