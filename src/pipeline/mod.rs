//! Per-request optimization pipeline: validate, sanitize, shortcut, normalize,
//! complete remotely, account.

use crate::completion::{CompletionProvider, ResponseCache};
use crate::config::Config;
use crate::error::{Result, SustainError};
use crate::middleware::InputValidator;
use crate::observability::MetricsCollector;
use crate::optimizer::{
    word_count, ArithmeticOutcome, ArithmeticShortcut, SavingsAccountant, StopwordList,
    TextNormalizer,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lower-cased prompt answered with [`CANNED_RESPONSE`]
pub const CANNED_TRIGGER: &str = "what is sustain?";

pub const CANNED_RESPONSE: &str = "I am SUSTAIN, an environmentally-friendly, token-optimized AI wrapper designed to reduce compute costs and increase productivity. I filter out irrelevant words and phrases from prompts and limit responses to essential outputs, minimizing the number of tokens used.";

/// Success body of `POST /api/sustain`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainResponse {
    pub response_text: String,
    pub percentage_saved: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_emissions: Option<String>,
}

impl SustainResponse {
    fn shortcut(response_text: String, percentage_saved: f64) -> Self {
        Self {
            response_text,
            percentage_saved,
            energy_used: None,
            co2_emissions: None,
        }
    }
}

/// Normalized prompt and the word counts it was measured with
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub optimized_text: String,
    pub original_word_count: usize,
    pub optimized_word_count: usize,
    pub percentage_saved: f64,
}

/// Request-independent pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_model: String,
    pub allowed_models: Vec<String>,
    pub max_input_chars: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_model: config.completion.default_model.clone(),
            allowed_models: config.completion.allowed_models.clone(),
            max_input_chars: config.optimizer.max_input_chars,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default_config())
    }
}

/// Orchestrates the optimizer stages and the completion provider for one request at a time
pub struct OptimizationPipeline {
    normalizer: TextNormalizer,
    arithmetic: ArithmeticShortcut,
    accountant: Arc<SavingsAccountant>,
    provider: Arc<dyn CompletionProvider>,
    settings: PipelineSettings,
    cache: Option<ResponseCache>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl OptimizationPipeline {
    pub fn new(
        stopwords: &StopwordList,
        accountant: Arc<SavingsAccountant>,
        provider: Arc<dyn CompletionProvider>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let arithmetic = ArithmeticShortcut::new()
            .map_err(|e| SustainError::Internal(format!("arithmetic matcher: {}", e)))?;

        Ok(Self {
            normalizer: TextNormalizer::new(stopwords)?,
            arithmetic,
            accountant,
            provider,
            settings,
            cache: None,
            metrics: None,
        })
    }

    /// Build the pipeline described by `config`
    pub fn from_config(
        config: &Config,
        stopwords: &StopwordList,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self> {
        let accountant = Arc::new(SavingsAccountant::from_config(
            &config.accounting,
            &config.completion.default_model,
        ));
        let pipeline = Self::new(stopwords, accountant, provider, PipelineSettings::from_config(config))?;

        if config.completion.cache_enabled {
            Ok(pipeline.with_cache(ResponseCache::new(
                config.completion.cache_size,
                Duration::from_secs(config.completion.cache_ttl_secs),
            )))
        } else {
            Ok(pipeline)
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn accountant(&self) -> &Arc<SavingsAccountant> {
        &self.accountant
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Requested model when allowed, the default otherwise
    pub fn select_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(model) if self.settings.allowed_models.iter().any(|m| m == model) => model,
            _ => &self.settings.default_model,
        }
    }

    /// Run one request through every stage
    pub async fn process(
        &self,
        user_input: Option<&str>,
        model: Option<&str>,
    ) -> Result<SustainResponse> {
        let started = Instant::now();
        let result = self.run(user_input, model).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_request(started.elapsed());
            if result.is_err() {
                metrics.record_error();
            }
        }

        result
    }

    async fn run(&self, user_input: Option<&str>, model: Option<&str>) -> Result<SustainResponse> {
        let raw = InputValidator::validate_user_input(user_input)?;
        let input = InputValidator::sanitize_text(raw, self.settings.max_input_chars);

        if input.to_lowercase() == CANNED_TRIGGER {
            debug!("Answering canned prompt");
            self.with_metric(MetricsCollector::record_canned);
            return Ok(SustainResponse::shortcut(CANNED_RESPONSE.to_string(), 0.0));
        }

        if let Some(outcome) = self.arithmetic.try_evaluate(&input) {
            self.with_metric(MetricsCollector::record_arithmetic);
            return Ok(match outcome {
                ArithmeticOutcome::Value(value) => {
                    info!("Arithmetic shortcut answered locally");
                    SustainResponse::shortcut(
                        format!("Math detected! Result: {}", format_number(value)),
                        100.0,
                    )
                }
                ArithmeticOutcome::Rejected(e) => {
                    warn!("Arithmetic expression rejected: {}", e);
                    SustainResponse::shortcut(format!("Math detected! Error: {}", e), 0.0)
                }
            });
        }

        let model = self.select_model(model);
        let optimized = self.optimize(&input);
        debug!(
            "Normalized prompt from {} to {} words",
            optimized.original_word_count, optimized.optimized_word_count
        );

        if let Some(cache) = &self.cache {
            if let Some(text) = cache.get(model, &optimized.optimized_text).await {
                self.with_metric(MetricsCollector::record_cache_hit);
                return Ok(SustainResponse::shortcut(text, 100.0));
            }
        }

        let remote_started = Instant::now();
        let completion = self.provider.complete(model, &optimized.optimized_text).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_completion(remote_started.elapsed());
        }
        let completion = completion.map_err(|e| {
            warn!("Completion failed for model {}: {}", model, e);
            SustainError::from(e)
        })?;

        let usage_tokens = i64::try_from(completion.usage_tokens).unwrap_or(i64::MAX);
        let tokens_saved = (optimized.original_word_count as i64)
            .saturating_sub(optimized.optimized_word_count as i64)
            .saturating_add(usage_tokens);
        self.accountant.accumulate(tokens_saved);

        let estimate = self
            .accountant
            .energy_and_co2(tokens_saved, self.accountant.energy_per_token(model));

        if let Some(cache) = &self.cache {
            cache
                .put(model, &optimized.optimized_text, completion.text.clone())
                .await;
        }

        info!(
            "Completed with {} ({}% input saved, {} tokens credited)",
            model, optimized.percentage_saved, tokens_saved
        );

        Ok(SustainResponse {
            response_text: completion.text,
            percentage_saved: optimized.percentage_saved,
            energy_used: Some(estimate.energy_used_display()),
            co2_emissions: Some(estimate.co2_emissions_display()),
        })
    }

    /// Normalize `input` and measure the reduction
    pub fn optimize(&self, input: &str) -> OptimizationResult {
        let optimized_text = self.normalizer.normalize(input);
        let original_word_count = word_count(input);
        let optimized_word_count = word_count(&optimized_text);

        OptimizationResult {
            optimized_text,
            original_word_count,
            optimized_word_count,
            percentage_saved: SavingsAccountant::estimate_input_savings(
                original_word_count,
                optimized_word_count,
            ),
        }
    }

    fn with_metric(&self, record: fn(&MetricsCollector)) {
        if let Some(metrics) = &self.metrics {
            record(metrics);
        }
    }
}

/// Print a number the way JavaScript does: no negative zero, exponent form
/// outside `[1e-6, 1e21)`
fn format_number(value: f64) -> String {
    let value = value + 0.0;
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Completion;
    use crate::error::CompletionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every call and answers with a fixed completion or error
    struct FakeProvider {
        calls: AtomicUsize,
        prompts: Mutex<Vec<(String, String)>>,
        fail_with: Option<fn() -> CompletionError>,
    }

    impl FakeProvider {
        fn ok() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), fail_with: None })
        }

        fn failing(err: fn() -> CompletionError) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), fail_with: Some(err) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete(&self, model: &str, prompt: &str) -> std::result::Result<Completion, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push((model.to_string(), prompt.to_string()));
            match self.fail_with {
                Some(err) => Err(err()),
                None => Ok(Completion { text: "Paris.".to_string(), usage_tokens: 20 }),
            }
        }
    }

    fn pipeline(provider: Arc<FakeProvider>) -> OptimizationPipeline {
        OptimizationPipeline::new(
            &StopwordList::from_lines("please\ncould you"),
            Arc::new(SavingsAccountant::default()),
            provider,
            PipelineSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());

        for input in [None, Some(""), Some("   ")] {
            let err = p.process(input, None).await.unwrap_err();
            assert!(matches!(err, SustainError::InvalidInput(_)));
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_canned_answer_is_trim_and_case_insensitive() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());

        for input in ["  WHAT IS SUSTAIN?  ", "what is sustain?"] {
            let response = p.process(Some(input), None).await.unwrap();
            assert_eq!(response.response_text, CANNED_RESPONSE);
            assert_eq!(response.percentage_saved, 0.0);
            assert_eq!(response.energy_used, None);
        }
        assert_eq!(provider.calls(), 0);
        assert_eq!(p.accountant().total_tokens_saved(), 0);
    }

    #[tokio::test]
    async fn test_arithmetic_shortcut_bypasses_provider() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());

        let response = p.process(Some("4+4"), None).await.unwrap();
        assert_eq!(response.response_text, "Math detected! Result: 8");
        assert_eq!(response.percentage_saved, 100.0);

        let response = p.process(Some("what is three plus four"), None).await.unwrap();
        assert_eq!(response.response_text, "Math detected! Result: 7");

        let response = p.process(Some("10/0"), None).await.unwrap();
        assert_eq!(response.response_text, "Math detected! Error: Result is not a finite number");
        assert_eq!(response.percentage_saved, 0.0);

        assert_eq!(provider.calls(), 0);
        assert_eq!(p.accountant().total_tokens_saved(), 0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-11.0), "-11");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(9999999999800000000000.0), "9.9999999998e+21");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[tokio::test]
    async fn test_arithmetic_result_text() {
        let p = pipeline(FakeProvider::ok());

        let response = p.process(Some("0 * -1"), None).await.unwrap();
        assert_eq!(response.response_text, "Math detected! Result: 0");

        let response = p.process(Some("99999999999 * 99999999999"), None).await.unwrap();
        assert_eq!(response.response_text, "Math detected! Result: 9.9999999998e+21");
    }

    #[tokio::test]
    async fn test_huge_usage_saturates_total() {
        struct HugeUsage;

        #[async_trait]
        impl CompletionProvider for HugeUsage {
            async fn complete(&self, _model: &str, _prompt: &str) -> std::result::Result<Completion, CompletionError> {
                Ok(Completion { text: "ok".to_string(), usage_tokens: u64::MAX })
            }
        }

        let p = OptimizationPipeline::new(
            &StopwordList::from_lines("please"),
            Arc::new(SavingsAccountant::default()),
            Arc::new(HugeUsage),
            PipelineSettings::default(),
        )
        .unwrap();

        let response = p.process(Some("summarize rust ownership"), None).await.unwrap();
        assert_eq!(response.response_text, "ok");
        assert_eq!(p.accountant().total_tokens_saved(), i64::MAX);
    }

    #[tokio::test]
    async fn test_full_pipeline_accounts_savings() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());

        let response = p
            .process(Some("Could you please tell me the capital city of France"), Some("gpt-4o"))
            .await
            .unwrap();

        // 10 words -> 7 words
        assert_eq!(response.response_text, "Paris.");
        assert_eq!(response.percentage_saved, 30.0);
        // 3 words + 20 usage tokens at 0.000003 kWh
        assert_eq!(response.energy_used.as_deref(), Some("0.0001"));
        assert_eq!(response.co2_emissions.as_deref(), Some("0.0000"));
        assert_eq!(p.accountant().total_tokens_saved(), 23);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            ("gpt-4o".to_string(), "tell me the capital city of France".to_string())
        );
    }

    #[test]
    fn test_optimize_measures_reduction() {
        let p = pipeline(FakeProvider::ok());

        let result = p.optimize("Please summarize it");
        assert_eq!(result.optimized_text, "summarize it");
        assert_eq!(result.original_word_count, 3);
        assert_eq!(result.optimized_word_count, 2);
        assert_eq!(result.percentage_saved, 33.33);

        let result = p.optimize("please");
        assert_eq!(result.optimized_text, "");
        assert_eq!(result.optimized_word_count, 0);
        assert_eq!(result.percentage_saved, 100.0);
    }

    #[tokio::test]
    async fn test_unknown_model_falls_back_to_default() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());
        assert_eq!(p.select_model(Some("gpt-9")), "gpt-3.5-turbo");
        assert_eq!(p.select_model(None), "gpt-3.5-turbo");
        assert_eq!(p.select_model(Some("gpt-4o")), "gpt-4o");

        p.process(Some("summarize rust ownership"), Some("davinci")).await.unwrap();
        assert_eq!(provider.prompts.lock().unwrap()[0].0, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_total_untouched() {
        let provider = FakeProvider::failing(|| CompletionError::QuotaExceeded);
        let p = pipeline(provider.clone());

        let err = p.process(Some("summarize rust ownership"), None).await.unwrap_err();
        assert!(matches!(err, SustainError::QuotaExceeded));
        assert_eq!(p.accountant().total_tokens_saved(), 0);

        let provider = FakeProvider::failing(|| CompletionError::Provider("boom".into()));
        let p = pipeline(provider);
        let err = p.process(Some("summarize rust ownership"), None).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_input_is_truncated_before_normalizing() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone());
        let long = "word ".repeat(400);

        p.process(Some(&long), None).await.unwrap();
        let prompt = provider.prompts.lock().unwrap()[0].1.clone();
        assert!(prompt.chars().count() <= 1000);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider_and_accounting() {
        let provider = FakeProvider::ok();
        let p = pipeline(provider.clone()).with_cache(ResponseCache::new(10, Duration::from_secs(60)));

        let first = p.process(Some("summarize rust ownership"), None).await.unwrap();
        let total = p.accountant().total_tokens_saved();
        let second = p.process(Some("summarize rust ownership"), None).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(second.response_text, first.response_text);
        assert_eq!(second.percentage_saved, 100.0);
        assert_eq!(second.energy_used, None);
        assert_eq!(p.accountant().total_tokens_saved(), total);
    }

    #[tokio::test]
    async fn test_metrics_are_recorded() {
        let metrics = Arc::new(MetricsCollector::new());
        let p = pipeline(FakeProvider::ok()).with_metrics(metrics.clone());

        p.process(Some("what is sustain?"), None).await.unwrap();
        p.process(Some("2*3"), None).await.unwrap();
        p.process(Some("summarize rust ownership"), None).await.unwrap();
        let _ = p.process(None, None).await;

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.total_errors, 1);
        assert_eq!(snapshot.canned_answers, 1);
        assert_eq!(snapshot.arithmetic_shortcuts, 1);
        assert_eq!(snapshot.remote_completions, 1);
    }
}
