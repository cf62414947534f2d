//! Per-tenant storage/API counters with optimistic reservation, §4.2.
//!
//! Reservations are tracked separately from `Tenant.storage_used_bytes`:
//! `reserve` holds bytes against a bounded TTL without touching the
//! permanent counter, `commit` promotes a reservation into `storage_used`,
//! and `release` drops it. The invariant `storage_used + Σ active
//! reservations ≤ storage_quota` is checked against both at `reserve` time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use archivus_core::domain::SubscriptionTier;
use archivus_core::{ArchivusError, ArchivusResult, TenantId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::store::InMemoryStore;

const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken(Uuid);

struct Reservation {
    tenant_id: TenantId,
    bytes: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub storage_used: u64,
    pub storage_quota: u64,
    pub storage_pct: f64,
    pub api_used: u64,
    pub api_quota: u64,
    pub api_pct: f64,
    pub can_upload: bool,
    pub can_process_ai: bool,
}

#[derive(Clone)]
pub struct QuotaManager {
    store: InMemoryStore,
    reservations: Arc<Mutex<HashMap<Uuid, Reservation>>>,
    reservation_ttl: Duration,
}

impl QuotaManager {
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            reservations: Arc::new(Mutex::new(HashMap::new())),
            reservation_ttl: DEFAULT_RESERVATION_TTL,
        }
    }

    /// The §4.2 tier table, overridable through `ConfigSnapshot`'s
    /// `quota.<tier>.*` keys (see `archivus_core::config`).
    pub fn tier_defaults(tier: SubscriptionTier) -> (u64, u64) {
        match tier {
            SubscriptionTier::Starter => (5 * 1024 * 1024 * 1024, 1_000),
            SubscriptionTier::Professional => (50 * 1024 * 1024 * 1024, 10_000),
            SubscriptionTier::Enterprise => (500 * 1024 * 1024 * 1024, 100_000),
        }
    }

    fn sweep_expired(&self) {
        let now = Utc::now();
        self.reservations.lock().retain(|_, r| r.expires_at > now);
    }

    fn active_reserved_for(&self, tenant_id: TenantId) -> u64 {
        self.reservations
            .lock()
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.bytes)
            .sum()
    }

    pub fn check(&self, tenant_id: TenantId) -> ArchivusResult<QuotaStatus> {
        self.sweep_expired();
        let tenant = self.store.get_tenant(tenant_id)?;
        let reserved = self.active_reserved_for(tenant_id);
        let storage_pct = if tenant.storage_quota_bytes == 0 {
            0.0
        } else {
            tenant.storage_used_bytes as f64 / tenant.storage_quota_bytes as f64 * 100.0
        };
        let api_pct = if tenant.api_quota_period == 0 {
            0.0
        } else {
            tenant.api_used_period as f64 / tenant.api_quota_period as f64 * 100.0
        };
        Ok(QuotaStatus {
            storage_used: tenant.storage_used_bytes,
            storage_quota: tenant.storage_quota_bytes,
            storage_pct,
            api_used: tenant.api_used_period,
            api_quota: tenant.api_quota_period,
            api_pct,
            can_upload: tenant.storage_used_bytes + reserved < tenant.storage_quota_bytes,
            can_process_ai: tenant.api_used_period < tenant.api_quota_period,
        })
    }

    /// Reserves `bytes` against the tenant's quota for `reservation_ttl`.
    /// Fails with `QuotaExceeded` rather than partially reserving.
    pub fn reserve(&self, tenant_id: TenantId, bytes: u64) -> ArchivusResult<ReservationToken> {
        self.sweep_expired();
        let tenant = self.store.get_tenant(tenant_id)?;
        let reserved = self.active_reserved_for(tenant_id);
        if tenant.storage_used_bytes + reserved + bytes > tenant.storage_quota_bytes {
            return Err(ArchivusError::quota_exceeded(format!(
                "reserving {bytes} bytes would exceed storage quota ({} used + {} reserved of {})",
                tenant.storage_used_bytes, reserved, tenant.storage_quota_bytes
            )));
        }

        let token = Uuid::new_v4();
        self.reservations.lock().insert(
            token,
            Reservation { tenant_id, bytes, expires_at: Utc::now() + self.reservation_ttl },
        );
        Ok(ReservationToken(token))
    }

    /// Promotes a reservation into the permanent `storage_used_bytes`
    /// counter. A no-op (not an error) if the reservation already expired —
    /// the caller's upload attempt has already failed by that point.
    pub fn commit(&self, token: ReservationToken) -> ArchivusResult<()> {
        let reservation = self.reservations.lock().remove(&token.0);
        let Some(reservation) = reservation else { return Ok(()) };
        self.store.mutate_tenant(reservation.tenant_id, |tenant| {
            tenant.storage_used_bytes += reservation.bytes;
        })?;
        Ok(())
    }

    /// Idempotent: dropping an already-released or expired token is not an
    /// error.
    pub fn release(&self, token: ReservationToken) {
        self.reservations.lock().remove(&token.0);
    }

    /// Eventual-consistent API usage counter bump.
    pub fn bump_api(&self, tenant_id: TenantId, n: u64) -> ArchivusResult<()> {
        self.store.mutate_tenant(tenant_id, |tenant| {
            tenant.api_used_period += n;
        })?;
        Ok(())
    }
}
