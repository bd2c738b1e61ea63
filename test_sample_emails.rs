#![allow(clippy::uninlined_format_args)]

use email_guard::config::Config;
use email_guard::registry::overall_decision;
use email_guard::AnalyzerRegistry;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Running sample emails through the default analyzers...");

    // Partial config: only the phrase thresholds are overridden, the rest defaults
    let config_yaml = r#"
rule_based:
  phishing_threshold: 70
  spam_threshold: 40
"#;

    let config: Config = serde_yaml::from_str(config_yaml)?;
    let registry = AnalyzerRegistry::from_config(&config)?;

    let samples = [
        (
            "lottery winner",
            "URGENT: You have won the lottery! Claim your $1,000,000 prize now. \
             Verify your account and confirm your password at http://claim-prize.tk/login",
        ),
        (
            "invoice nudge",
            "Please act now, asap. Your invoice is attached.",
        ),
        (
            "lunch plans",
            "Hi team, are we still on for lunch on Thursday? Let me know.",
        ),
        ("empty", ""),
    ];

    for (label, text) in samples {
        println!();
        println!("=== {} ===", label);
        let results = registry.analyze_email(text);
        for result in &results {
            println!(
                "  {} [{}] -> {} ({:.2})",
                result.model_name, result.model_source, result.decision, result.confidence
            );
            println!("    {}", result.description);
        }
        println!("  overall: {}", overall_decision(&results));
    }

    let info = registry.model_info();
    println!();
    println!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}
