//! Regex and keyword scans over raw email text.

use crate::config::RuleBasedConfig;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(
        r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(\\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+"
    )
    .unwrap();
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap();
}

/// All HTTP/HTTPS URLs in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn has_url(text: &str) -> bool {
    URL_REGEX.is_match(text)
}

pub fn has_email_address(text: &str) -> bool {
    EMAIL_REGEX.is_match(text)
}

/// Number of distinct keywords present in the text, ignoring case.
pub fn count_keywords<S: AsRef<str>>(text: &str, keywords: &[S]) -> usize {
    let text_lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|keyword| text_lower.contains(&keyword.as_ref().to_lowercase()))
        .count()
}

/// Everything the scorer needs from one pass over the text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signals {
    pub word_count: usize,
    pub char_count: usize,
    pub urgency_indicators: usize,
    pub money_indicators: usize,
    pub has_urls: bool,
    pub has_email_addresses: bool,
    /// Indices into the matcher's categories, in category order.
    pub categories: Vec<usize>,
}

struct CompiledCategory {
    name: String,
    patterns: Vec<Regex>,
}

pub struct PatternMatcher {
    urgency_keywords: Vec<String>,
    money_keywords: Vec<String>,
    categories: Vec<CompiledCategory>,
}

impl PatternMatcher {
    pub fn from_config(config: &RuleBasedConfig) -> anyhow::Result<Self> {
        let mut categories = Vec::with_capacity(config.categories.len());

        for category in &config.categories {
            let mut patterns = Vec::with_capacity(category.patterns.len());
            for pattern in &category.patterns {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "Invalid pattern '{}' in category '{}': {}",
                            pattern,
                            category.name,
                            e
                        )
                    })?;
                patterns.push(regex);
            }
            categories.push(CompiledCategory {
                name: category.name.clone(),
                patterns,
            });
        }

        Ok(Self {
            urgency_keywords: config
                .urgency_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            money_keywords: config
                .money_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            categories,
        })
    }

    /// Names of the categories whose patterns match, first hit wins per category.
    pub fn detect_categories(&self, text: &str) -> Vec<&str> {
        self.matching_categories(text)
            .into_iter()
            .map(|idx| self.categories[idx].name.as_str())
            .collect()
    }

    fn matching_categories(&self, text: &str) -> Vec<usize> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(_, category)| category.patterns.iter().any(|p| p.is_match(text)))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn scan(&self, text: &str) -> Signals {
        let text_lower = text.to_lowercase();

        let signals = Signals {
            word_count: text_lower.split_whitespace().count(),
            char_count: text_lower.chars().count(),
            urgency_indicators: count_keywords(&text_lower, &self.urgency_keywords),
            money_indicators: count_keywords(&text_lower, &self.money_keywords),
            has_urls: has_url(&text_lower),
            has_email_addresses: has_email_address(&text_lower),
            categories: self.matching_categories(text),
        };

        log::debug!(
            "Scanned {} words: urgency={}, money={}, categories={:?}",
            signals.word_count,
            signals.urgency_indicators,
            signals.money_indicators,
            self.detect_categories(text)
        );

        signals
    }
}
