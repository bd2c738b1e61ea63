use clap::{Arg, Command};
use email_guard::registry::overall_decision;
use email_guard::{AnalysisResult, AnalyzerRegistry, Config, Decision};
use log::LevelFilter;
use std::io::Read;
use std::process;

fn cli() -> Command {
    Command::new("email-guard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Classifies email text as safe, spam or phishing")
        .long_about("Email Guard - runs email text through every registered analyzer:\n\
                    • optional external phishing-URL model (first URL in the message)\n\
                    • rule-based scoring of urgency, financial and personal-info requests\n\
                    Each analyzer reports its own decision, confidence and explanation.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/email-guard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("test-email")
                .long("test-email")
                .value_name("FILE")
                .help("Analyze an email file ('-' reads standard input)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model-info")
                .long("model-info")
                .help("Show registered analyzers and their status")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print JSON instead of a readable report")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
}

fn main() {
    let mut command = cli();
    let matches = command.clone().get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/email-guard.yaml");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let registry = match AnalyzerRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let json = matches.get_flag("json");

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!();
        println!(
            "Phrase categories: {}",
            config.rule_based.categories.len()
        );
        for category in &config.rule_based.categories {
            println!(
                "  {} (+{}): {} patterns",
                category.name,
                category.weight,
                category.patterns.len()
            );
        }
        match &config.url_model.endpoint {
            Some(endpoint) if config.url_model.enabled => {
                println!("URL model endpoint: {endpoint}")
            }
            _ => println!("URL model: not configured"),
        }
        println!("Registered analyzers: {}", registry.analyzer_names().join(", "));
        println!("✅ All regex patterns compiled successfully.");
        return;
    }

    if matches.get_flag("model-info") {
        print_model_info(&registry, json);
        return;
    }

    if let Some(email_file) = matches.get_one::<String>("test-email") {
        test_email_file(&registry, email_file, json);
        return;
    }

    if let Err(e) = command.print_help() {
        eprintln!("Error printing help: {e}");
    }
    println!();
    process::exit(2);
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Set url_model.endpoint to enable the external URL model.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn read_email(email_file: &str) -> std::io::Result<Vec<u8>> {
    if email_file == "-" {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read(email_file)
    }
}

fn print_model_info(registry: &AnalyzerRegistry, json: bool) {
    let info = registry.model_info();

    if json {
        match serde_json::to_string_pretty(&info) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("Error serializing model info: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!("📊 Registered models ({} total):", info.total_models);
    for model in &info.models {
        println!("  • {} [{}] - {:?}", model.name, model.source, model.status);
    }
    println!();
    if info.primary_model_available {
        println!("✅ Primary model: {}", info.primary_model_name);
    } else {
        println!(
            "⚠️  Primary ML model unavailable, using {}",
            info.primary_model_name
        );
    }
}

fn decision_marker(decision: Decision) -> &'static str {
    match decision {
        Decision::Safe => "✅",
        Decision::Spam => "🏷️ ",
        Decision::Phishing => "🚨",
        Decision::Unknown => "❔",
        Decision::Error => "❌",
    }
}

fn print_result(result: &AnalysisResult) {
    println!(
        "{} {} ({}): {} - confidence {:.2}",
        decision_marker(result.decision),
        result.model_name,
        result.model_source,
        result.decision.to_string().to_uppercase(),
        result.confidence
    );
    println!("   {}", result.description);
}

fn test_email_file(registry: &AnalyzerRegistry, email_file: &str, json: bool) {
    let email_bytes = match read_email(email_file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Error reading email file: {}", e);
            process::exit(1);
        }
    };

    let results = registry.analyze_email_bytes(&email_bytes);

    if json {
        match serde_json::to_string_pretty(&results) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!("🧪 Testing email file: {}", email_file);
    println!("   Size: {} bytes", email_bytes.len());
    println!();

    for result in &results {
        print_result(result);
    }

    println!();
    let overall = overall_decision(&results);
    println!(
        "{} Overall: {}",
        decision_marker(overall),
        overall.to_string().to_uppercase()
    );
}
