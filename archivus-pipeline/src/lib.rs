//! Intake, quota, dispatch, and the nine stage handlers that turn a raw
//! upload into a fully analyzed document (§4 of the design).
//!
//! [`PipelineContext`] is the shared collaborator bundle every stage handler
//! and [`intake::IntakeService`] run against; [`pipeline::Pipeline`] wires it
//! together with a registered [`archivus_queue::QueueAdapter`] and starts
//! worker pools on demand via [`pipeline::Dispatcher`].

pub mod analytics;
pub mod audit;
pub mod context;
pub mod fingerprint;
pub mod intake;
pub mod pipeline;
pub mod quota;
pub mod stages;
pub mod store;

pub use context::PipelineContext;
pub use intake::{IntakeService, UploadOptions, UploadPayload, UploadResult};
pub use pipeline::{Dispatcher, Pipeline};
pub use quota::{QuotaManager, QuotaStatus, ReservationToken};
pub use store::InMemoryStore;

pub mod prelude {
    pub use crate::context::PipelineContext;
    pub use crate::intake::{IntakeService, UploadOptions, UploadPayload, UploadResult};
    pub use crate::pipeline::{Dispatcher, Pipeline};
    pub use crate::quota::QuotaManager;
    pub use crate::store::InMemoryStore;
}
