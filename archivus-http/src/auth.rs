//! Bearer-token authentication. §6.1: every non-public route requires a
//! bearer token carrying `user_id`, `tenant_id`, `role`, issued-at,
//! expires-at, "interpreted by the Auth collaborator" — an external identity
//! provider this design only consumes the interface of (§1). This module
//! owns that boundary: the [`TokenVerifier`] trait, plus [`DevTokenVerifier`]
//! as the stand-in a caller who hasn't wired a real issuer gets by default.

use std::sync::Arc;

use archivus_core::{ArchivusError, ArchivusResult, RequestContext, Role, TenantId};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub tenant_id: TenantId,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// What the HTTP layer needs from whatever issues tokens. Not part of this
/// design's scope (§1 lists "the authentication provider" as an external
/// collaborator); a production deployment supplies its own implementation.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> ArchivusResult<Claims>;
}

/// Decodes the bearer token as base64url-encoded JSON claims, unsigned.
/// Exists so the routes below have a real `TokenVerifier` to run against in
/// tests and local use; swap in a signed-JWT verifier for a real deployment.
pub struct DevTokenVerifier;

impl TokenVerifier for DevTokenVerifier {
    fn verify(&self, token: &str) -> ArchivusResult<Claims> {
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, token)
            .map_err(|e| ArchivusError::unauthorized(format!("malformed token: {e}")))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| ArchivusError::unauthorized(format!("malformed token claims: {e}")))
    }
}

fn bearer_token(parts: &Parts) -> ArchivusResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ArchivusError::unauthorized("missing authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| ArchivusError::unauthorized("authorization header is not a bearer token"))?
        .trim();
    if token.is_empty() {
        return Err(ArchivusError::unauthorized("empty bearer token"));
    }
    Ok(token)
}

/// Extracted on every non-public route. Carries the tenant scope, actor, and
/// role the rest of the handler runs under.
pub struct AuthContext(pub RequestContext);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.verifier.verify(token)?;
        if claims.is_expired() {
            return Err(ArchivusError::unauthorized("token expired").into());
        }
        let ctx = RequestContext::new(claims.tenant_id)
            .with_actor(claims.user_id)
            .with_role(claims.role);
        Ok(AuthContext(ctx))
    }
}

/// Test/dev helper: encodes `claims` the way [`DevTokenVerifier`] expects to
/// decode them, for building an `Authorization` header in integration tests.
pub fn encode_dev_token(claims: &Claims) -> String {
    let body = serde_json::to_vec(claims).expect("claims serialize");
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, body)
}

pub type SharedVerifier = Arc<dyn TokenVerifier>;
