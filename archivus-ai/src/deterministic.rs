//! A deterministic, in-process [`AiProvider`] with no network I/O. Used for
//! local development and test harnesses so stage handlers and pipeline
//! tests can run against the full capability set without a live model
//! provider.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::adapter::AiProvider;
use crate::capability::AiCapabilities;
use crate::error::AiResult;
use crate::types::{ClassificationResult, ExtractedEntities, FinancialData, LineItem, TokenUsage};

/// Fixed embedding dimensionality for the deterministic provider.
pub const EMBEDDING_DIM: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct DeterministicProvider;

impl DeterministicProvider {
    pub fn new() -> Self {
        Self
    }

    fn usage_for(text: &str) -> TokenUsage {
        let approx_tokens = (text.split_whitespace().count() as u64).max(1);
        TokenUsage {
            input_tokens: approx_tokens,
            output_tokens: approx_tokens / 2 + 1,
            requests: 1,
        }
    }

    fn seed(text: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl AiProvider for DeterministicProvider {
    fn capabilities(&self) -> AiCapabilities {
        AiCapabilities::all()
    }

    async fn extract_text(&self, text: &str) -> AiResult<(String, TokenUsage)> {
        Ok((text.to_string(), Self::usage_for(text)))
    }

    async fn generate_embedding(&self, text: &str) -> AiResult<(Vec<f32>, TokenUsage)> {
        let mut seed = Self::seed(text);
        let vector: Vec<f32> = (0..EMBEDDING_DIM)
            .map(|_| {
                // xorshift64* for a cheap, deterministic pseudo-random stream
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                ((seed % 2001) as f32 / 1000.0) - 1.0
            })
            .collect();
        Ok((vector, Self::usage_for(text)))
    }

    async fn generate_summary(&self, text: &str) -> AiResult<(String, TokenUsage)> {
        let preview: String = text.chars().take(160).collect();
        let summary = format!(
            "Executive Summary: {preview}\nKey Points: (derived from document content)\nImportant Details: none flagged\nAction Items: none flagged"
        );
        Ok((summary, Self::usage_for(text)))
    }

    async fn extract_entities(&self, text: &str) -> AiResult<(ExtractedEntities, TokenUsage)> {
        let capitalized: Vec<String> = text
            .split_whitespace()
            .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .take(10)
            .collect();

        let entities = ExtractedEntities {
            organizations: capitalized,
            ..Default::default()
        };
        Ok((entities, Self::usage_for(text)))
    }

    async fn classify_document(&self, text: &str) -> AiResult<(ClassificationResult, TokenUsage)> {
        let lower = text.to_lowercase();
        let (doc_type, confidence, reasoning) = if lower.contains("invoice") {
            ("Invoice", 0.92, "document body contains the term 'invoice'")
        } else if lower.contains("receipt") {
            ("Receipt", 0.9, "document body contains the term 'receipt'")
        } else if lower.contains("contract") || lower.contains("agreement") {
            ("Contract", 0.88, "document body contains contract/agreement language")
        } else {
            ("Other", 0.5, "no distinguishing keywords found")
        };

        let result = ClassificationResult {
            doc_type: doc_type.to_string(),
            confidence,
            reasoning: reasoning.to_string(),
        };
        Ok((result, Self::usage_for(text)))
    }

    async fn generate_tags(&self, text: &str) -> AiResult<(Vec<String>, TokenUsage)> {
        let mut tags: Vec<String> = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.len() >= 4 && w.len() <= 20)
            .collect();
        tags.sort();
        tags.dedup();
        tags.truncate(8);
        if tags.is_empty() {
            tags.push("document".to_string());
        }
        Ok((tags, Self::usage_for(text)))
    }

    async fn extract_financial_data(&self, text: &str, doc_type: &str) -> AiResult<(FinancialData, TokenUsage)> {
        let total_amount_minor_units = text
            .split_whitespace()
            .find_map(|token| {
                let cleaned: String = token.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
                cleaned.parse::<f64>().ok()
            })
            .map(|amount| (amount * 100.0).round() as i64);

        let data = FinancialData {
            total_amount_minor_units,
            currency: None,
            due_date: None,
            invoice_number: None,
            tax_amount_minor_units: None,
            items: total_amount_minor_units
                .map(|amount| vec![LineItem { description: doc_type.to_string(), amount_minor_units: Some(amount) }])
                .unwrap_or_default(),
            payment_terms: None,
            vendor: None,
            client: None,
        };
        Ok((data, Self::usage_for(text)))
    }

    async fn perform_ocr(&self, blob_path: &str) -> AiResult<(String, TokenUsage)> {
        let text = format!("[ocr text derived from {blob_path}]");
        Ok((text.clone(), Self::usage_for(&text)))
    }
}
