//! Rule-based analyzer
//!
//! Additive risk scoring over the pattern matcher's signals. This analyzer is
//! always registered and is the guaranteed fallback.

use super::{AnalysisResult, Analyzer, Decision};
use crate::config::RuleBasedConfig;
use crate::patterns::{PatternMatcher, Signals};

pub const RULE_BASED_NAME: &str = "rule-based";
pub const RULE_BASED_SOURCE: &str = "built-in";

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: u32,
    pub decision: Decision,
    pub confidence: f64,
    pub factors: Vec<String>,
}

impl RiskAssessment {
    pub fn description(&self) -> String {
        if self.factors.is_empty() {
            format!(
                "Risk score: {}/100. No suspicious patterns detected. Email appears to be safe based on rule-based analysis.",
                self.score
            )
        } else {
            format!(
                "Risk score: {}/100. Detected factors: {}. This analysis is based on pattern matching and content analysis.",
                self.score,
                self.factors.join(", ")
            )
        }
    }
}

/// Maps a risk score onto a decision and confidence.
///
/// Safe confidence falls from 1.0 at score 0 to its 0.6 floor near the spam
/// threshold.
pub fn decide(score: u32, phishing_threshold: u32, spam_threshold: u32) -> (Decision, f64) {
    let score_f = score as f64;

    if score >= phishing_threshold {
        (Decision::Phishing, (score_f / 100.0).min(0.95))
    } else if score >= spam_threshold {
        (
            Decision::Spam,
            (score_f / phishing_threshold as f64).min(0.85),
        )
    } else {
        (
            Decision::Safe,
            (1.0 - score_f / spam_threshold as f64).max(0.6),
        )
    }
}

pub struct RuleBasedAnalyzer {
    config: RuleBasedConfig,
    matcher: PatternMatcher,
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        // Built-in patterns are known to compile
        Self::from_config(&RuleBasedConfig::default()).unwrap()
    }
}

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RuleBasedConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let matcher = PatternMatcher::from_config(config)?;

        Ok(Self {
            config: config.clone(),
            matcher,
        })
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn score_signals(&self, signals: &Signals) -> RiskAssessment {
        let mut score: u32 = 0;
        let mut factors = Vec::new();

        for &idx in &signals.categories {
            if let Some(category) = self.config.categories.get(idx) {
                score = score.saturating_add(category.weight);
                factors.push(category.label.clone());
            }
        }

        if signals.urgency_indicators > 0 {
            let count = signals.urgency_indicators as u32;
            score = score.saturating_add(count.saturating_mul(self.config.urgency_keyword_weight));
            factors.push(format!("{} urgency indicators", count));
        }

        if signals.money_indicators > 0 {
            let count = signals.money_indicators as u32;
            score = score.saturating_add(count.saturating_mul(self.config.money_keyword_weight));
            factors.push(format!("{} financial indicators", count));
        }

        let (decision, confidence) = decide(
            score,
            self.config.phishing_threshold,
            self.config.spam_threshold,
        );

        RiskAssessment {
            score,
            decision,
            confidence,
            factors,
        }
    }

    pub fn assess(&self, email_text: &str) -> RiskAssessment {
        let signals = self.matcher.scan(email_text);
        self.score_signals(&signals)
    }
}

impl Analyzer for RuleBasedAnalyzer {
    fn analyze(&self, email_text: &str) -> AnalysisResult {
        let assessment = self.assess(email_text);
        log::debug!(
            "Rule-based score {} -> {}",
            assessment.score,
            assessment.decision
        );

        AnalysisResult::new(
            self,
            assessment.decision,
            assessment.confidence,
            assessment.description(),
        )
    }

    fn name(&self) -> &str {
        RULE_BASED_NAME
    }

    fn source(&self) -> &str {
        RULE_BASED_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let (decision, confidence) = decide(70, 70, 40);
        assert_eq!(decision, Decision::Phishing);
        assert!((confidence - 0.7).abs() < 1e-9);

        let (decision, _) = decide(69, 70, 40);
        assert_eq!(decision, Decision::Spam);

        let (decision, confidence) = decide(40, 70, 40);
        assert_eq!(decision, Decision::Spam);
        assert!((confidence - 40.0 / 70.0).abs() < 1e-9);

        let (decision, confidence) = decide(39, 70, 40);
        assert_eq!(decision, Decision::Safe);
        assert!((confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_caps() {
        assert_eq!(decide(250, 70, 40).1, 0.95);
        assert_eq!(decide(65, 70, 40).1, 0.85);
        assert_eq!(decide(0, 70, 40), (Decision::Safe, 1.0));
        assert_eq!(decide(20, 70, 40).1, 0.6);
        assert_eq!(decide(10, 70, 40).1, 0.75);
    }

    #[test]
    fn test_text_scoring_exactly_70() {
        let analyzer = RuleBasedAnalyzer::new();
        // urgency category (30) + hurry, quickly, asap, deadline (40)
        let assessment = analyzer.assess("Act now: hurry, quickly, asap, deadline");
        assert_eq!(assessment.score, 70);
        assert_eq!(assessment.decision, Decision::Phishing);
    }

    #[test]
    fn test_text_scoring_exactly_40() {
        let analyzer = RuleBasedAnalyzer::new();
        // urgency category (30) + asap (10)
        let assessment = analyzer.assess("Please act now, asap.");
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.decision, Decision::Spam);
    }

    #[test]
    fn test_text_scoring_below_spam() {
        let analyzer = RuleBasedAnalyzer::new();
        // refund (15) + hurry, quickly (20)
        let assessment = analyzer.assess("Hurry, your refund ships quickly");
        assert_eq!(assessment.score, 35);
        assert_eq!(assessment.decision, Decision::Safe);
        assert!((assessment.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_lottery_phishing_scenario() {
        let analyzer = RuleBasedAnalyzer::new();
        let text = "Congratulations! You won a lottery, urgent action required, verify your bank account now";
        let assessment = analyzer.assess(text);

        // urgency (30) + financial (40) + urgent (10) + bank, account, lottery (45)
        assert_eq!(assessment.score, 125);
        assert_eq!(assessment.decision, Decision::Phishing);
        assert!(assessment.confidence >= 0.7);
        assert!(assessment
            .factors
            .contains(&"Urgency indicators detected".to_string()));
        assert!(assessment
            .factors
            .contains(&"Financial request detected".to_string()));

        let result = analyzer.analyze(text);
        assert_eq!(result.decision, Decision::Phishing);
        assert_eq!(result.confidence, 0.95);
        assert!(result.description.starts_with("Risk score: 125/100."));
    }

    #[test]
    fn test_benign_text_full_confidence() {
        let analyzer = RuleBasedAnalyzer::new();
        let result = analyzer.analyze("Hi, let's meet for lunch tomorrow");

        assert_eq!(result.decision, Decision::Safe);
        // Score 0 gives max(1 - 0, 0.6) = 1.0
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.model_name, "rule-based");
        assert_eq!(result.model_source, "built-in");
        assert!(result.description.contains("No suspicious patterns detected"));
    }

    #[test]
    fn test_deterministic() {
        let analyzer = RuleBasedAnalyzer::new();
        let text = "Security alert: password reset required for your account details";
        assert_eq!(analyzer.assess(text), analyzer.assess(text));
        assert_eq!(analyzer.analyze(text), analyzer.analyze(text));
    }

    #[test]
    fn test_score_is_monotonic() {
        let analyzer = RuleBasedAnalyzer::new();
        let additions = [
            "urgent action",
            "bank account",
            "verify identity",
            "paypal verify",
            "limited time",
            "credit card refund",
            "inheritance transfer",
            "hurry",
        ];

        let mut text = String::from("Hello there.");
        let mut previous = analyzer.assess(&text).score;
        for addition in &additions {
            text.push(' ');
            text.push_str(addition);
            let score = analyzer.assess(&text).score;
            assert!(
                score >= previous,
                "score dropped from {} to {} after adding '{}'",
                previous,
                score,
                addition
            );
            previous = score;
        }
    }

    #[test]
    fn test_edge_inputs_do_not_fail() {
        let analyzer = RuleBasedAnalyzer::new();
        let long_text = "lorem ipsum ".repeat(50_000);
        let inputs = [
            "",
            "   ",
            "https://example.com https://example.org",
            "Привет, 你好, مرحبا",
            long_text.as_str(),
        ];

        for input in &inputs {
            let result = analyzer.analyze(input);
            assert!((0.0..=1.0).contains(&result.confidence));
            assert_ne!(result.decision, Decision::Error);
        }
    }

    #[test]
    fn test_custom_config_weights() {
        let mut config = RuleBasedConfig::default();
        config.money_keyword_weight = 0;
        config.urgency_keyword_weight = 0;
        let analyzer = RuleBasedAnalyzer::from_config(&config).unwrap();

        let assessment = analyzer.assess("bank account money");
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.factors.len(), 2);
    }
}
