//! Tenant identity and the request-scoped context threaded through every
//! core operation.

use std::fmt;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque 128-bit tenant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role a user acts under within their tenant. Drives authorization
/// decisions in the HTTP layer; core operations take it as an opaque label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    User,
    Viewer,
    Accountant,
    Compliance,
}

/// Context carried with every Archivus operation. No ambient globals: a
/// handler that needs to know whose request this is takes a
/// `RequestContext`, full stop.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub actor_id: Option<Uuid>,
    pub role: Option<Role>,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            actor_id: None,
            role: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// True once the caller has asked for this operation to stop (request
    /// dropped, document soft-deleted mid-flight, etc.).
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// A context for background work (reapers, sweeps) that isn't tied to
    /// an inbound request but still needs a tenant scope.
    pub fn background(tenant_id: TenantId) -> Self {
        Self::new(tenant_id)
    }
}
