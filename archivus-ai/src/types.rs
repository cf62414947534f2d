//! Request/response shapes for each capability call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context threaded through every adapter call: which tenant is paying for
/// the request and a cancellation handle so a blocked rate-limit wait can be
/// unblocked from the caller.
#[derive(Debug, Clone)]
pub struct AiCtx {
    pub tenant_id: String,
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl AiCtx {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            cancellation: tokio_util::sync::CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: tokio_util::sync::CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Structured entity map, keys fixed per the capability table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub amounts: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub doc_type: String,
    pub confidence: f32,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount_minor_units: Option<i64>,
}

/// Financial fields extracted from a document. Amounts are scaled integers
/// (minor units); the adapter never hands back a float amount.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialData {
    pub total_amount_minor_units: Option<i64>,
    pub currency: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub invoice_number: Option<String>,
    pub tax_amount_minor_units: Option<i64>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub payment_terms: Option<String>,
    pub vendor: Option<String>,
    pub client: Option<String>,
}

/// Cumulative usage counters tracked across the adapter's lifetime, per
/// §4.6's observability obligation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub requests: u64,
}
