pub mod analyzers;
pub mod config;
pub mod patterns;
pub mod predictor;
pub mod registry;

pub use analyzers::{AnalysisResult, Analyzer, Decision, ModelStatus};
pub use config::Config;
pub use registry::{AnalyzerRegistry, ModelInfo};
