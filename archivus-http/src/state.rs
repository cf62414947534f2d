//! Shared application state handed to every axum handler.

use std::sync::Arc;

use archivus_pipeline::{IntakeService, PipelineContext};

use crate::auth::SharedVerifier;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineContext,
    pub intake: Arc<IntakeService>,
    pub verifier: SharedVerifier,
}

impl AppState {
    pub fn new(pipeline: PipelineContext, verifier: SharedVerifier) -> Self {
        let intake = Arc::new(IntakeService::new(pipeline.clone()));
        Self { pipeline, intake, verifier }
    }
}
