//! The `Tenant` entity (not to be confused with [`crate::TenantId`], which is
//! just the identifier carried in [`crate::RequestContext`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Starter,
    Professional,
    Enterprise,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Days after soft-delete before a hard-delete sweep may remove the row.
    pub retain_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceRules {
    pub requires_audit_export: bool,
    pub allowed_regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Unique, lowercase, `[a-z0-9-]`, 3-63 chars, not in a reserved set.
    /// Immutable once set.
    pub subdomain: String,
    pub tier: SubscriptionTier,
    pub storage_quota_bytes: u64,
    pub storage_used_bytes: u64,
    pub api_quota_period: u64,
    pub api_used_period: u64,
    pub default_currency: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub retention_policy: RetentionPolicy,
    pub compliance_rules: ComplianceRules,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(subdomain: impl Into<String>, tier: SubscriptionTier) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId(Uuid::new_v4()),
            subdomain: subdomain.into(),
            tier,
            storage_quota_bytes: 0,
            storage_used_bytes: 0,
            api_quota_period: 0,
            api_used_period: 0,
            default_currency: "USD".to_string(),
            trial_ends_at: None,
            active: true,
            retention_policy: RetentionPolicy::default(),
            compliance_rules: ComplianceRules::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `storage_used ≤ storage_quota` except transiently during release.
    pub fn storage_within_quota(&self) -> bool {
        self.storage_used_bytes <= self.storage_quota_bytes
    }

    /// ISO 4217 currency used when a financial extraction doesn't pin one.
    pub fn currency_for_financials(&self) -> &str {
        if self.default_currency.is_empty() {
            "USD"
        } else {
            &self.default_currency
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_tenant_defaults_to_usd() {
        let tenant = Tenant::new("acme", SubscriptionTier::Starter);
        assert_eq!(tenant.currency_for_financials(), "USD");
    }

    #[test]
    fn quota_check_reflects_usage() {
        let mut tenant = Tenant::new("acme", SubscriptionTier::Starter);
        tenant.storage_quota_bytes = 100;
        tenant.storage_used_bytes = 50;
        assert!(tenant.storage_within_quota());
        tenant.storage_used_bytes = 150;
        assert!(!tenant.storage_within_quota());
    }
}
