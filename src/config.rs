use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub url_model: UrlModelConfig,
    #[serde(default)]
    pub rule_based: RuleBasedConfig,
}

/// External phishing-URL model. Without an endpoint the analyzer is never
/// registered and the rule-based analyzer runs alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlModelConfig {
    pub enabled: bool,
    pub name: String,
    pub source: String,
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for UrlModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "phishing-url-model".to_string(),
            source: "http".to_string(),
            endpoint: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBasedConfig {
    pub urgency_keywords: Vec<String>,
    pub money_keywords: Vec<String>,
    pub urgency_keyword_weight: u32,
    pub money_keyword_weight: u32,
    pub categories: Vec<PhraseCategory>,
    pub phishing_threshold: u32,
    pub spam_threshold: u32,
}

/// A group of loose "word ... word" patterns. The category contributes its
/// weight once, no matter how many of its patterns match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseCategory {
    pub name: String,
    pub label: String,
    pub weight: u32,
    pub patterns: Vec<String>,
}

impl PhraseCategory {
    fn new(name: &str, label: &str, weight: u32, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            weight,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleBasedConfig {
    fn default() -> Self {
        Self {
            urgency_keywords: strings(&[
                "urgent",
                "immediate",
                "asap",
                "quickly",
                "hurry",
                "limited time",
                "expires",
                "deadline",
            ]),
            money_keywords: strings(&[
                "money",
                "bank",
                "account",
                "credit card",
                "payment",
                "transfer",
                "refund",
                "lottery",
                "inheritance",
            ]),
            urgency_keyword_weight: 10,
            money_keyword_weight: 15,
            categories: vec![
                PhraseCategory::new(
                    "urgency",
                    "Urgency indicators detected",
                    30,
                    &[
                        r"urgent.*action",
                        r"limited.*time",
                        r"expires.*soon",
                        r"act.*now",
                        r"immediate.*attention",
                    ],
                ),
                PhraseCategory::new(
                    "financial_request",
                    "Financial request detected",
                    40,
                    &[
                        r"bank.*account",
                        r"credit.*card",
                        r"payment.*required",
                        r"money.*transfer",
                        r"account.*verification",
                    ],
                ),
                PhraseCategory::new(
                    "personal_info_request",
                    "Personal information request detected",
                    50,
                    &[
                        r"social.*security",
                        r"password.*reset",
                        r"personal.*information",
                        r"verify.*identity",
                        r"account.*details",
                    ],
                ),
                PhraseCategory::new(
                    "suspicious_domain",
                    "Suspicious domain detected",
                    60,
                    &[
                        r"paypal.*verify",
                        r"bank.*secure",
                        r"account.*update",
                        r"security.*alert",
                    ],
                ),
            ],
            phishing_threshold: 70,
            spam_threshold: 40,
        }
    }
}

impl RuleBasedConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.spam_threshold == 0 {
            anyhow::bail!("spam_threshold must be greater than zero");
        }
        if self.phishing_threshold <= self.spam_threshold {
            anyhow::bail!(
                "phishing_threshold ({}) must be greater than spam_threshold ({})",
                self.phishing_threshold,
                self.spam_threshold
            );
        }
        for category in &self.categories {
            if category.patterns.is_empty() {
                anyhow::bail!("Phrase category '{}' has no patterns", category.name);
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
