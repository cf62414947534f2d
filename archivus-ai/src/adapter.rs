//! The `AiAdapter`: a capability-typed collaborator wrapping an
//! [`AiProvider`] with rate limiting, retry, and token accounting, so no
//! stage handler has to reimplement any of those three concerns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{instrument, warn};

use crate::capability::{AiCapabilities, AiCapability};
use crate::error::{AiError, AiResult};
use crate::ratelimit::RateLimiter;
use crate::types::{AiCtx, ClassificationResult, ExtractedEntities, FinancialData, TokenUsage};

/// A specific AI backend. Implementors advertise which capabilities they
/// support via [`AiProvider::capabilities`]; the adapter never calls a
/// method whose capability bit is unset.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn capabilities(&self) -> AiCapabilities;

    async fn extract_text(&self, text: &str) -> AiResult<(String, TokenUsage)>;
    async fn generate_embedding(&self, text: &str) -> AiResult<(Vec<f32>, TokenUsage)>;
    async fn generate_summary(&self, text: &str) -> AiResult<(String, TokenUsage)>;
    async fn extract_entities(&self, text: &str) -> AiResult<(ExtractedEntities, TokenUsage)>;
    async fn classify_document(&self, text: &str) -> AiResult<(ClassificationResult, TokenUsage)>;
    async fn generate_tags(&self, text: &str) -> AiResult<(Vec<String>, TokenUsage)>;
    async fn extract_financial_data(&self, text: &str, doc_type: &str) -> AiResult<(FinancialData, TokenUsage)>;
    async fn perform_ocr(&self, blob_path: &str) -> AiResult<(String, TokenUsage)>;
}

#[derive(Debug, Clone)]
pub struct AiAdapterConfig {
    pub rate_limit_rpm: u64,
    pub retry_attempts: u32,
    pub base_retry_backoff: Duration,
    pub max_retry_backoff: Duration,
}

impl Default for AiAdapterConfig {
    fn default() -> Self {
        Self {
            rate_limit_rpm: 60,
            retry_attempts: 3,
            base_retry_backoff: Duration::from_millis(500),
            max_retry_backoff: Duration::from_secs(30),
        }
    }
}

impl AiAdapterConfig {
    /// Build from a core `ConfigSnapshot`'s `ai.*` keys.
    pub fn from_snapshot(snapshot: &archivus_core::ConfigSnapshot) -> Self {
        Self {
            rate_limit_rpm: snapshot.ai_rate_limit_rpm(),
            retry_attempts: snapshot.ai_retry_attempts(),
            ..Default::default()
        }
    }
}

/// Wraps any [`AiProvider`] with rate limiting, retry-with-backoff, and
/// cumulative token accounting.
pub struct AiAdapter {
    provider: Arc<dyn AiProvider>,
    limiter: RateLimiter,
    config: AiAdapterConfig,
    usage: Mutex<TokenUsage>,
}

impl AiAdapter {
    pub fn new<P: AiProvider + 'static>(provider: P, config: AiAdapterConfig) -> Self {
        Self {
            limiter: RateLimiter::per_minute(config.rate_limit_rpm as usize),
            provider: Arc::new(provider),
            config,
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    pub fn capabilities(&self) -> AiCapabilities {
        self.provider.capabilities()
    }

    /// Cumulative counters since this adapter was constructed.
    pub fn usage(&self) -> TokenUsage {
        *self.usage.lock()
    }

    fn require(&self, capability: AiCapability) -> AiResult<()> {
        if self.capabilities().supports(capability) {
            Ok(())
        } else {
            Err(AiError::CapabilityUnavailable(capability.name().to_string()))
        }
    }

    fn record(&self, delta: TokenUsage) {
        let mut usage = self.usage.lock();
        usage.input_tokens += delta.input_tokens;
        usage.output_tokens += delta.output_tokens;
        usage.requests += delta.requests;
    }

    /// Runs `call` under the rate limiter, retrying retryable errors with
    /// exponential backoff up to `retry_attempts`.
    async fn call_with_retry<T, F, Fut>(&self, ctx: &AiCtx, mut call: F) -> AiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AiResult<(T, TokenUsage)>>,
    {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire(&ctx.cancellation).await?;

            if ctx.cancellation.is_cancelled() {
                return Err(AiError::Cancelled);
            }

            match call().await {
                Ok((value, usage)) => {
                    self.record(usage);
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    let backoff = std::cmp::min(
                        self.config.base_retry_backoff.saturating_mul(2u32.saturating_pow(attempt - 1)),
                        self.config.max_retry_backoff,
                    );
                    warn!(attempt, ?backoff, "ai adapter call failed, retrying: {}", err);
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = ctx.cancellation.cancelled() => return Err(AiError::Cancelled),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn extract_text(&self, ctx: &AiCtx, text: &str) -> AiResult<String> {
        self.require(AiCapability::ExtractText)?;
        self.call_with_retry(ctx, || self.provider.extract_text(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn generate_embedding(&self, ctx: &AiCtx, text: &str) -> AiResult<Vec<f32>> {
        self.require(AiCapability::GenerateEmbedding)?;
        self.call_with_retry(ctx, || self.provider.generate_embedding(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn generate_summary(&self, ctx: &AiCtx, text: &str) -> AiResult<String> {
        self.require(AiCapability::GenerateSummary)?;
        self.call_with_retry(ctx, || self.provider.generate_summary(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn extract_entities(&self, ctx: &AiCtx, text: &str) -> AiResult<ExtractedEntities> {
        self.require(AiCapability::ExtractEntities)?;
        self.call_with_retry(ctx, || self.provider.extract_entities(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn classify_document(&self, ctx: &AiCtx, text: &str) -> AiResult<ClassificationResult> {
        self.require(AiCapability::ClassifyDocument)?;
        self.call_with_retry(ctx, || self.provider.classify_document(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn generate_tags(&self, ctx: &AiCtx, text: &str) -> AiResult<Vec<String>> {
        self.require(AiCapability::GenerateTags)?;
        self.call_with_retry(ctx, || self.provider.generate_tags(text)).await
    }

    #[instrument(skip(self, text), fields(tenant_id = %ctx.tenant_id))]
    pub async fn extract_financial_data(&self, ctx: &AiCtx, text: &str, doc_type: &str) -> AiResult<FinancialData> {
        self.require(AiCapability::ExtractFinancialData)?;
        self.call_with_retry(ctx, || self.provider.extract_financial_data(text, doc_type)).await
    }

    #[instrument(skip(self), fields(tenant_id = %ctx.tenant_id))]
    pub async fn perform_ocr(&self, ctx: &AiCtx, blob_path: &str) -> AiResult<String> {
        self.require(AiCapability::PerformOcr)?;
        self.call_with_retry(ctx, || self.provider.perform_ocr(blob_path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        caps: AiCapabilities,
        failures_before_success: AtomicU32,
    }

    #[async_trait]
    impl AiProvider for FlakyProvider {
        fn capabilities(&self) -> AiCapabilities {
            self.caps
        }

        async fn extract_text(&self, text: &str) -> AiResult<(String, TokenUsage)> {
            Ok((text.to_string(), TokenUsage { input_tokens: 1, output_tokens: 1, requests: 1 }))
        }

        async fn generate_embedding(&self, _text: &str) -> AiResult<(Vec<f32>, TokenUsage)> {
            Err(AiError::CapabilityUnavailable("embeddings".to_string()))
        }

        async fn generate_summary(&self, _text: &str) -> AiResult<(String, TokenUsage)> {
            if self.failures_before_success.fetch_sub(1, Ordering::SeqCst) > 1 {
                Err(AiError::Upstream("503".to_string()))
            } else {
                Ok(("summary".to_string(), TokenUsage::default()))
            }
        }

        async fn extract_entities(&self, _text: &str) -> AiResult<(ExtractedEntities, TokenUsage)> {
            unimplemented!()
        }

        async fn classify_document(&self, _text: &str) -> AiResult<(ClassificationResult, TokenUsage)> {
            unimplemented!()
        }

        async fn generate_tags(&self, _text: &str) -> AiResult<(Vec<String>, TokenUsage)> {
            unimplemented!()
        }

        async fn extract_financial_data(&self, _text: &str, _doc_type: &str) -> AiResult<(FinancialData, TokenUsage)> {
            unimplemented!()
        }

        async fn perform_ocr(&self, _blob_path: &str) -> AiResult<(String, TokenUsage)> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn unsupported_capability_fails_fast_without_calling_provider() {
        let provider = FlakyProvider { caps: AiCapabilities::none(), failures_before_success: AtomicU32::new(0) };
        let adapter = AiAdapter::new(provider, AiAdapterConfig::default());
        let ctx = AiCtx::new("acme");

        let result = adapter.extract_text(&ctx, "hello").await;
        assert!(matches!(result, Err(AiError::CapabilityUnavailable(_))));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_until_success() {
        let mut caps = AiCapabilities::none();
        caps.generate_summary = true;
        let provider = FlakyProvider { caps, failures_before_success: AtomicU32::new(2) };
        let mut config = AiAdapterConfig::default();
        config.base_retry_backoff = Duration::from_millis(1);
        let adapter = AiAdapter::new(provider, config);
        let ctx = AiCtx::new("acme");

        let result = adapter.generate_summary(&ctx, "doc text").await.unwrap();
        assert_eq!(result, "summary");
    }

    #[tokio::test]
    async fn token_usage_accumulates_across_calls() {
        let mut caps = AiCapabilities::none();
        caps.extract_text = true;
        let provider = FlakyProvider { caps, failures_before_success: AtomicU32::new(0) };
        let adapter = AiAdapter::new(provider, AiAdapterConfig::default());
        let ctx = AiCtx::new("acme");

        adapter.extract_text(&ctx, "a").await.unwrap();
        adapter.extract_text(&ctx, "b").await.unwrap();

        let usage = adapter.usage();
        assert_eq!(usage.requests, 2);
        assert_eq!(usage.input_tokens, 2);
    }
}
