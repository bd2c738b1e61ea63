//! URL model analyzer
//!
//! Asks an external phishing-URL classifier about the first URL in the email.
//! When no model is loaded, the email has no URL, or the prediction fails, it
//! falls back to a keyword-density check over the text.

use super::{panic_message, AnalysisResult, Analyzer, Decision, ModelStatus};
use crate::patterns::{count_keywords, extract_urls};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

const DEFAULT_CONFIDENCE: f64 = 0.85;

const FALLBACK_SUSPICIOUS_WORDS: [&str; 6] = [
    "urgent",
    "account suspended",
    "verify identity",
    "click here",
    "bank",
    "password",
];

/// Answer from an external URL model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlPrediction {
    /// `1` means phishing, `0` means safe, anything else is unknown.
    #[serde(default = "default_prediction")]
    pub prediction: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_prediction() -> Value {
    Value::from(0)
}

impl UrlPrediction {
    pub fn new(prediction: impl Into<Value>) -> Self {
        Self {
            prediction: prediction.into(),
            description: None,
            confidence: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn decision(&self) -> Decision {
        match &self.prediction {
            Value::Bool(true) => Decision::Phishing,
            Value::Bool(false) => Decision::Safe,
            Value::Number(n) => match n.as_f64() {
                Some(v) if v == 1.0 => Decision::Phishing,
                Some(v) if v == 0.0 => Decision::Safe,
                _ => Decision::Unknown,
            },
            _ => Decision::Unknown,
        }
    }
}

/// External phishing-URL classifier.
pub trait UrlPredictor: Send + Sync {
    fn predict(&self, url: &str) -> anyhow::Result<UrlPrediction>;
}

impl<F> UrlPredictor for F
where
    F: Fn(&str) -> anyhow::Result<UrlPrediction> + Send + Sync,
{
    fn predict(&self, url: &str) -> anyhow::Result<UrlPrediction> {
        self(url)
    }
}

pub type PredictorLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn UrlPredictor>> + Send + Sync>;

enum ModelState {
    Loaded(Box<dyn UrlPredictor>),
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
    Unavailable,
}

pub struct UrlModelAnalyzer {
    name: String,
    source: String,
    loader: PredictorLoader,
    state: OnceLock<ModelState>,
}

impl UrlModelAnalyzer {
    pub fn new(name: impl Into<String>, source: impl Into<String>, loader: PredictorLoader) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            loader,
            state: OnceLock::new(),
        }
    }

    /// Analyzer around an already constructed predictor.
    pub fn with_predictor<P>(name: impl Into<String>, source: impl Into<String>, predictor: P) -> Self
    where
        P: UrlPredictor + 'static,
    {
        let analyzer = Self::new(
            name,
            source,
            Box::new(|| -> anyhow::Result<Box<dyn UrlPredictor>> {
                anyhow::bail!("predictor supplied at construction")
            }),
        );
        let _ = analyzer
            .state
            .set(ModelState::Loaded(Box::new(predictor)));
        analyzer
    }

    /// Runs the loader once. Later calls return the first outcome.
    pub fn load(&self) -> LoadState {
        let state = self.state.get_or_init(|| {
            match panic::catch_unwind(AssertUnwindSafe(|| (self.loader)())) {
                Ok(Ok(predictor)) => {
                    log::info!("✓ Loaded URL model: {}", self.name);
                    ModelState::Loaded(predictor)
                }
                Ok(Err(e)) => {
                    log::warn!(
                        "✗ Failed to load URL model {}: {e}. Using text analysis as fallback",
                        self.name
                    );
                    ModelState::Unavailable(e.to_string())
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    log::warn!(
                        "✗ URL model {} panicked while loading: {message}. Using text analysis as fallback",
                        self.name
                    );
                    ModelState::Unavailable(message)
                }
            }
        });
        Self::kind(state)
    }

    pub fn load_state(&self) -> LoadState {
        self.state.get().map_or(LoadState::Unloaded, Self::kind)
    }

    /// Reason the model could not be loaded, if it failed.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self.state.get() {
            Some(ModelState::Unavailable(reason)) => Some(reason),
            _ => None,
        }
    }

    fn kind(state: &ModelState) -> LoadState {
        match state {
            ModelState::Loaded(_) => LoadState::Loaded,
            ModelState::Unavailable(_) => LoadState::Unavailable,
        }
    }

    fn predictor(&self) -> Option<&dyn UrlPredictor> {
        self.load();
        match self.state.get() {
            Some(ModelState::Loaded(predictor)) => Some(predictor.as_ref()),
            _ => None,
        }
    }

    fn analyze_url(&self, predictor: &dyn UrlPredictor, url: &str) -> anyhow::Result<AnalysisResult> {
        let prediction = panic::catch_unwind(AssertUnwindSafe(|| predictor.predict(url)))
            .map_err(|payload| {
                anyhow::anyhow!("URL model panicked: {}", panic_message(&*payload))
            })??;

        let decision = prediction.decision();
        let confidence = prediction
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE);
        let description = prediction
            .description
            .unwrap_or_else(|| format!("URL analysis result for {url}"));

        log::debug!("URL model verdict for {url}: {decision} ({confidence:.2})");
        Ok(AnalysisResult::new(self, decision, confidence, description))
    }

    /// Keyword-density check used when the URL model cannot answer.
    pub fn analyze_text_content(&self, email_text: &str) -> AnalysisResult {
        let suspicious_count = count_keywords(email_text, &FALLBACK_SUSPICIOUS_WORDS);

        let (decision, confidence, description) = if suspicious_count >= 3 {
            (
                Decision::Phishing,
                (0.8 + (suspicious_count - 3) as f64 * 0.1).min(0.95),
                format!(
                    "High risk phishing indicators detected: {suspicious_count} suspicious patterns found in email content. Multiple red flags suggest this is likely a phishing attempt."
                ),
            )
        } else if suspicious_count >= 1 {
            (
                Decision::Spam,
                0.6 + suspicious_count as f64 * 0.1,
                format!(
                    "Spam indicators detected: {suspicious_count} suspicious patterns found. This email shows characteristics of spam or low-quality content."
                ),
            )
        } else {
            (
                Decision::Safe,
                0.7,
                "No suspicious patterns detected: Email content appears safe with 0 suspicious indicators found.".to_string(),
            )
        };

        AnalysisResult::new(self, decision, confidence, description)
    }

    fn analyze_inner(&self, email_text: &str) -> AnalysisResult {
        let urls = extract_urls(email_text);

        if let (Some(predictor), Some(url)) = (self.predictor(), urls.first()) {
            match self.analyze_url(predictor, url) {
                Ok(result) => return result,
                Err(e) => log::warn!("URL analysis failed, falling back to text analysis: {e}"),
            }
        }

        self.analyze_text_content(email_text)
    }
}

impl Analyzer for UrlModelAnalyzer {
    fn analyze(&self, email_text: &str) -> AnalysisResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.analyze_inner(email_text))) {
            Ok(result) => result,
            Err(payload) => AnalysisResult::error(self, panic_message(&*payload)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn status(&self) -> ModelStatus {
        match self.load_state() {
            LoadState::Loaded => ModelStatus::Loaded,
            _ => ModelStatus::Available,
        }
    }
}
