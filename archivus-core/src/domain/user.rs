use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Role, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: TenantId,
    /// Lowercase, tenant-unique.
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub mfa_enabled: bool,
    pub mfa_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(tenant_id: TenantId, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.into().to_lowercase(),
            role,
            active: true,
            mfa_enabled: false,
            mfa_secret: None,
            created_at: now,
            updated_at: now,
        }
    }
}
