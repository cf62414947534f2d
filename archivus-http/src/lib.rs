//! archivus-http: the versioned `/api/v1` HTTP surface over the processing
//! pipeline — upload, download, preview, AI-result, and job-inspection
//! endpoints (§6.1).

pub mod app;
pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use app::build_router;
pub use auth::{AuthContext, DevTokenVerifier, TokenVerifier};
pub use error::ApiError;
pub use state::AppState;
