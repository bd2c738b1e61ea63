//! Analyzer registry
//!
//! Holds the ordered analyzers and runs each one over the same email text.
//! The URL model analyzer comes first when it is configured; the rule-based
//! analyzer is always last, so the registry is never empty.

use crate::analyzers::rule_based::RULE_BASED_NAME;
use crate::analyzers::url_model::PredictorLoader;
use crate::analyzers::{
    panic_message, AnalysisResult, Analyzer, Decision, ModelStatus, RuleBasedAnalyzer,
    UrlModelAnalyzer, UrlPredictor,
};
use crate::config::{Config, UrlModelConfig};
use crate::predictor::HttpUrlPredictor;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub source: String,
    pub status: ModelStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub total_models: usize,
    pub models: Vec<ModelEntry>,
    pub primary_model_available: bool,
    pub primary_model_name: String,
}

/// Checks whether an external URL model is configured and wraps it in an
/// analyzer. `None` means the registry runs rule-based only.
pub fn probe_url_model(config: &UrlModelConfig) -> Option<UrlModelAnalyzer> {
    if !config.enabled {
        log::info!("URL model disabled in configuration, using rule-based analysis only");
        return None;
    }

    let Some(endpoint) = config.endpoint.clone() else {
        log::warn!("No URL model endpoint configured, using rule-based analysis only");
        return None;
    };

    let timeout = Duration::from_secs(config.timeout_seconds.max(1));
    let loader: PredictorLoader = Box::new(move || -> anyhow::Result<Box<dyn UrlPredictor>> {
        let predictor = HttpUrlPredictor::new(&endpoint, timeout)?;
        Ok(Box::new(predictor) as Box<dyn UrlPredictor>)
    });

    Some(UrlModelAnalyzer::new(
        config.name.clone(),
        config.source.clone(),
        loader,
    ))
}

pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
    url_model_index: Option<usize>,
}

impl AnalyzerRegistry {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let rule_based = RuleBasedAnalyzer::from_config(&config.rule_based)?;
        Ok(Self::new(probe_url_model(&config.url_model), rule_based))
    }

    pub fn new(url_model: Option<UrlModelAnalyzer>, rule_based: RuleBasedAnalyzer) -> Self {
        let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
        let mut url_model_index = None;

        if let Some(url_model) = url_model {
            url_model.load();
            log::info!("✓ URL model analyzer registered: {}", url_model.name());
            url_model_index = Some(analyzers.len());
            analyzers.push(Box::new(url_model));
        }

        analyzers.push(Box::new(rule_based));
        log::info!("✓ Rule-based fallback analyzer registered");

        Self {
            analyzers,
            url_model_index,
        }
    }

    /// Registers a custom analyzer ahead of the rule-based fallback.
    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        log::info!(
            "✓ Custom analyzer registered: {} ({})",
            analyzer.name(),
            analyzer.source()
        );
        let position = self.analyzers.len() - 1;
        self.analyzers.insert(position, analyzer);
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Runs every analyzer in registration order. One result per analyzer.
    pub fn analyze_email(&self, email_text: &str) -> Vec<AnalysisResult> {
        self.analyzers
            .iter()
            .map(|analyzer| Self::run_analyzer(analyzer.as_ref(), email_text))
            .collect()
    }

    /// Same as [`Self::analyze_email`] for raw bytes that may not be UTF-8.
    pub fn analyze_email_bytes(&self, email_bytes: &[u8]) -> Vec<AnalysisResult> {
        let email_text = String::from_utf8_lossy(email_bytes);
        self.analyze_email(&email_text)
    }

    fn run_analyzer(analyzer: &dyn Analyzer, email_text: &str) -> AnalysisResult {
        match panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(email_text))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(&*payload);
                log::error!("Analyzer {} failed: {message}", analyzer.name());
                AnalysisResult::error(analyzer, message)
            }
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        let models: Vec<ModelEntry> = self
            .analyzers
            .iter()
            .map(|analyzer| ModelEntry {
                name: analyzer.name().to_string(),
                source: analyzer.source().to_string(),
                status: analyzer.status(),
            })
            .collect();

        let primary = self
            .url_model_index
            .map(|idx| &self.analyzers[idx])
            .filter(|analyzer| analyzer.status() == ModelStatus::Loaded);

        ModelInfo {
            total_models: models.len(),
            models,
            primary_model_available: primary.is_some(),
            primary_model_name: primary
                .map(|analyzer| analyzer.name().to_string())
                .unwrap_or_else(|| RULE_BASED_NAME.to_string()),
        }
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new(None, RuleBasedAnalyzer::new())
    }
}

/// Most severe verdict across results, ignoring `unknown` and `error`.
pub fn overall_decision(results: &[AnalysisResult]) -> Decision {
    let rank = |decision: Decision| match decision {
        Decision::Phishing => 3,
        Decision::Spam => 2,
        Decision::Safe => 1,
        Decision::Unknown | Decision::Error => 0,
    };

    results
        .iter()
        .map(|r| r.decision)
        .max_by_key(|d| rank(*d))
        .filter(|d| rank(*d) > 0)
        .unwrap_or(Decision::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::UrlPrediction;

    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn analyze(&self, _email_text: &str) -> AnalysisResult {
            panic!("classifier exploded")
        }

        fn name(&self) -> &str {
            "panicky"
        }

        fn source(&self) -> &str {
            "test"
        }
    }

    struct FixedAnalyzer(Decision);

    impl Analyzer for FixedAnalyzer {
        fn analyze(&self, _email_text: &str) -> AnalysisResult {
            AnalysisResult::new(self, self.0, 0.5, "fixed")
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn source(&self) -> &str {
            "test"
        }
    }

    fn loaded_url_model() -> UrlModelAnalyzer {
        UrlModelAnalyzer::with_predictor(
            "phishing-url-model",
            "http",
            |_: &str| -> anyhow::Result<UrlPrediction> { Ok(UrlPrediction::new(1)) },
        )
    }

    #[test]
    fn test_rule_based_only_registry() {
        let registry = AnalyzerRegistry::default();
        assert_eq!(registry.len(), 1);

        let info = registry.model_info();
        assert_eq!(info.total_models, 1);
        assert!(!info.primary_model_available);
        assert_eq!(info.primary_model_name, "rule-based");
        assert_eq!(info.models[0].status, ModelStatus::Available);
    }

    #[test]
    fn test_probe_without_endpoint() {
        assert!(probe_url_model(&UrlModelConfig::default()).is_none());

        let disabled = UrlModelConfig {
            enabled: false,
            endpoint: Some("http://127.0.0.1:8080/predict".to_string()),
            ..Default::default()
        };
        assert!(probe_url_model(&disabled).is_none());

        let registry = AnalyzerRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.analyzer_names(), vec!["rule-based"]);
    }

    #[test]
    fn test_probe_with_endpoint_registers_first() {
        let config = Config {
            url_model: UrlModelConfig {
                endpoint: Some("http://127.0.0.1:9/predict".to_string()),
                timeout_seconds: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        let registry = AnalyzerRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.analyzer_names(),
            vec!["phishing-url-model", "rule-based"]
        );

        let info = registry.model_info();
        assert!(info.primary_model_available);
        assert_eq!(info.primary_model_name, "phishing-url-model");
        assert_eq!(info.models[0].status, ModelStatus::Loaded);

        // Endpoint is unreachable, so the URL analyzer falls back to text
        let results = registry.analyze_email("Click here: https://example.com/verify");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].model_source, "http");
        assert_eq!(results[0].decision, Decision::Spam);
    }

    #[test]
    fn test_bad_endpoint_stays_registered_in_fallback_mode() {
        let config = UrlModelConfig {
            endpoint: Some("not a url".to_string()),
            ..Default::default()
        };

        let registry = AnalyzerRegistry::new(probe_url_model(&config), RuleBasedAnalyzer::new());
        assert_eq!(registry.len(), 2);

        let info = registry.model_info();
        assert!(!info.primary_model_available);
        assert_eq!(info.primary_model_name, "rule-based");
        assert_eq!(info.models[0].status, ModelStatus::Available);

        let results = registry.analyze_email("urgent: verify identity at https://example.com");
        assert_eq!(results[0].decision, Decision::Spam);
    }

    #[test]
    fn test_results_follow_registration_order() {
        let registry = AnalyzerRegistry::new(Some(loaded_url_model()), RuleBasedAnalyzer::new());
        let results = registry.analyze_email("Hi, see https://example.com for the agenda");

        assert_eq!(results.len(), registry.len());
        assert_eq!(results[0].model_name, "phishing-url-model");
        assert_eq!(results[0].decision, Decision::Phishing);
        assert_eq!(results[1].model_name, "rule-based");
        assert_eq!(results[1].decision, Decision::Safe);
    }

    #[test]
    fn test_custom_analyzer_runs_before_rule_based() {
        let mut registry = AnalyzerRegistry::default();
        registry.add_analyzer(Box::new(FixedAnalyzer(Decision::Spam)));

        assert_eq!(registry.analyzer_names(), vec!["fixed", "rule-based"]);
        let results = registry.analyze_email("hello");
        assert_eq!(results[0].decision, Decision::Spam);
        assert_eq!(results[1].model_name, "rule-based");
    }

    #[test]
    fn test_panicking_analyzer_is_isolated() {
        let mut registry = AnalyzerRegistry::new(Some(loaded_url_model()), RuleBasedAnalyzer::new());
        registry.add_analyzer(Box::new(PanickingAnalyzer));

        let results = registry.analyze_email("https://example.com urgent action required");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].decision, Decision::Phishing);
        assert_eq!(results[1].decision, Decision::Error);
        assert_eq!(results[1].confidence, 0.0);
        assert_eq!(results[1].model_name, "panicky");
        assert!(results[1].description.contains("classifier exploded"));
        assert_ne!(results[2].decision, Decision::Error);
    }

    #[test]
    fn test_every_input_yields_well_formed_results() {
        let registry = AnalyzerRegistry::new(Some(loaded_url_model()), RuleBasedAnalyzer::new());
        let long_text = "urgent bank account ".repeat(20_000);
        let inputs = [
            "",
            "\n\n\t",
            "https://only.example.com",
            "日本語のメール https://例え.jp",
            long_text.as_str(),
        ];

        for input in &inputs {
            let results = registry.analyze_email(input);
            assert_eq!(results.len(), registry.len());
            for result in &results {
                assert!((0.0..=1.0).contains(&result.confidence));
                assert!(!result.model_name.is_empty());
            }
        }
    }

    #[test]
    fn test_non_utf8_bytes() {
        let registry = AnalyzerRegistry::default();
        let bytes = b"Urgent action \xff\xfe required, verify your bank account";
        let results = registry.analyze_email_bytes(bytes);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].decision, Decision::Phishing);
    }

    #[test]
    fn test_model_info_serializes_camel_case() {
        let info = AnalyzerRegistry::default().model_info();
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["totalModels"], 1);
        assert_eq!(json["primaryModelAvailable"], false);
        assert_eq!(json["primaryModelName"], "rule-based");
        assert_eq!(json["models"][0]["status"], "available");
    }

    #[test]
    fn test_overall_decision() {
        let registry = AnalyzerRegistry::new(Some(loaded_url_model()), RuleBasedAnalyzer::new());
        let results = registry.analyze_email("Lunch? https://example.com");
        assert_eq!(overall_decision(&results), Decision::Phishing);

        assert_eq!(overall_decision(&[]), Decision::Unknown);
    }
}
