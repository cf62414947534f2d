//! archivus-ai: a capability-typed AI adapter.
//!
//! Any provider implements [`AiProvider`] and advertises which capabilities
//! it supports; [`AiAdapter`] wraps it with a sliding-window rate limiter,
//! retry-with-backoff for transient upstream errors, and cumulative token
//! accounting, so stage handlers never touch any of that machinery
//! directly. [`DeterministicProvider`] implements every capability without
//! network I/O, for local development and tests.
//!
//! ```rust
//! use archivus_ai::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let adapter = AiAdapter::new(DeterministicProvider::new(), AiAdapterConfig::default());
//! let ctx = AiCtx::new("acme");
//!
//! let summary = adapter.generate_summary(&ctx, "quarterly report body").await.unwrap();
//! assert!(summary.contains("Executive Summary"));
//! # }
//! ```

pub mod adapter;
pub mod capability;
pub mod deterministic;
pub mod error;
pub mod ratelimit;
pub mod types;

pub use adapter::{AiAdapter, AiAdapterConfig, AiProvider};
pub use capability::{AiCapabilities, AiCapability};
pub use deterministic::DeterministicProvider;
pub use error::{AiError, AiResult};
pub use ratelimit::RateLimiter;
pub use types::{AiCtx, ClassificationResult, ExtractedEntities, FinancialData, LineItem, TokenUsage};

pub mod prelude {
    pub use crate::{
        AiAdapter, AiAdapterConfig, AiCapabilities, AiCapability, AiCtx, AiError, AiProvider,
        AiResult, ClassificationResult, DeterministicProvider, ExtractedEntities, FinancialData,
        TokenUsage,
    };
}
