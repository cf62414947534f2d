//! Domain entities: the data model every component operates on.

pub mod analytics;
pub mod audit;
pub mod document;
pub mod job;
pub mod tenant;
pub mod user;

pub use analytics::DocumentAnalytics;
pub use audit::{AuditAction, AuditLog};
pub use document::{
    Document, DocumentAiResult, DocumentEmbedding, DocumentFinancial, DocumentStatus,
    DocumentType, DocumentView,
};
pub use job::{Job, JobStatus, StageType};
pub use tenant::{ComplianceRules, RetentionPolicy, SubscriptionTier, Tenant};
pub use user::User;
