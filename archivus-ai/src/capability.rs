//! The AI adapter is capability-typed: a specific provider implements a
//! subset of the calls in the table below. Callers query `supports()` and
//! skip a stage with a terminal `CapabilityUnavailable` rather than treating
//! an unsupported call as a generic failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiCapability {
    ExtractText,
    GenerateEmbedding,
    GenerateSummary,
    ExtractEntities,
    ClassifyDocument,
    GenerateTags,
    ExtractFinancialData,
    PerformOcr,
}

impl AiCapability {
    pub fn all() -> [AiCapability; 8] {
        use AiCapability::*;
        [
            ExtractText,
            GenerateEmbedding,
            GenerateSummary,
            ExtractEntities,
            ClassifyDocument,
            GenerateTags,
            ExtractFinancialData,
            PerformOcr,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AiCapability::ExtractText => "extract_text",
            AiCapability::GenerateEmbedding => "generate_embedding",
            AiCapability::GenerateSummary => "generate_summary",
            AiCapability::ExtractEntities => "extract_entities",
            AiCapability::ClassifyDocument => "classify_document",
            AiCapability::GenerateTags => "generate_tags",
            AiCapability::ExtractFinancialData => "extract_financial_data",
            AiCapability::PerformOcr => "perform_ocr",
        }
    }
}

impl std::fmt::Display for AiCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Explicit feature detection for a provider, mirroring the queue backend's
/// `QueueCapabilities` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCapabilities {
    pub extract_text: bool,
    pub generate_embedding: bool,
    pub generate_summary: bool,
    pub extract_entities: bool,
    pub classify_document: bool,
    pub generate_tags: bool,
    pub extract_financial_data: bool,
    pub perform_ocr: bool,
}

impl AiCapabilities {
    pub fn none() -> Self {
        Self {
            extract_text: false,
            generate_embedding: false,
            generate_summary: false,
            extract_entities: false,
            classify_document: false,
            generate_tags: false,
            extract_financial_data: false,
            perform_ocr: false,
        }
    }

    /// Every capability implemented; the shape the deterministic adapter
    /// advertises.
    pub fn all() -> Self {
        Self {
            extract_text: true,
            generate_embedding: true,
            generate_summary: true,
            extract_entities: true,
            classify_document: true,
            generate_tags: true,
            extract_financial_data: true,
            perform_ocr: true,
        }
    }

    pub fn supports(&self, capability: AiCapability) -> bool {
        match capability {
            AiCapability::ExtractText => self.extract_text,
            AiCapability::GenerateEmbedding => self.generate_embedding,
            AiCapability::GenerateSummary => self.generate_summary,
            AiCapability::ExtractEntities => self.extract_entities,
            AiCapability::ClassifyDocument => self.classify_document,
            AiCapability::GenerateTags => self.generate_tags,
            AiCapability::ExtractFinancialData => self.extract_financial_data,
            AiCapability::PerformOcr => self.perform_ocr,
        }
    }

    pub fn supported(&self) -> Vec<AiCapability> {
        AiCapability::all().into_iter().filter(|c| self.supports(*c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_supports_nothing() {
        let caps = AiCapabilities::none();
        for cap in AiCapability::all() {
            assert!(!caps.supports(cap));
        }
    }

    #[test]
    fn all_supports_every_named_capability() {
        let caps = AiCapabilities::all();
        assert_eq!(caps.supported().len(), 8);
    }
}
