//! Pluggable email analyzers
//!
//! Every analyzer turns email text into exactly one [`AnalysisResult`].
//! Failures never escape an analyzer; they come back as an `error` decision
//! with zero confidence.

pub mod rule_based;
pub mod url_model;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

pub use rule_based::RuleBasedAnalyzer;
pub use url_model::{UrlModelAnalyzer, UrlPrediction, UrlPredictor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Safe,
    Spam,
    Phishing,
    Unknown,
    Error,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Safe => "safe",
            Decision::Spam => "spam",
            Decision::Phishing => "phishing",
            Decision::Unknown => "unknown",
            Decision::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub model_source: String,
    pub model_name: String,
    pub decision: Decision,
    pub confidence: f64,
    pub description: String,
}

impl AnalysisResult {
    /// Builds a result, clamping the confidence into `[0, 1]`.
    pub fn new(
        analyzer: &dyn Analyzer,
        decision: Decision,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            model_source: analyzer.source().to_string(),
            model_name: analyzer.name().to_string(),
            decision,
            confidence,
            description: description.into(),
        }
    }

    pub fn error(analyzer: &dyn Analyzer, message: impl fmt::Display) -> Self {
        Self {
            model_source: analyzer.source().to_string(),
            model_name: analyzer.name().to_string(),
            decision: Decision::Error,
            confidence: 0.0,
            description: format!("Analysis failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// An external model is loaded and answering.
    Loaded,
    Available,
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "analyzer panicked".to_string()
    }
}

/// Trait for all email analyzers
pub trait Analyzer: Send + Sync {
    fn analyze(&self, email_text: &str) -> AnalysisResult;
    fn name(&self) -> &str;
    fn source(&self) -> &str;

    fn status(&self) -> ModelStatus {
        ModelStatus::Available
    }
}
