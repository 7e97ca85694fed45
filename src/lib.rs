//! App Fraud Analyzer Library
//!
//! Collects Play Store listings, enriches them with reviews, permissions,
//! developer signals and screenshot captions, then runs five LLM dimension
//! classifiers and an overall arbitration verdict per app.

pub mod config;
pub mod consumer;
pub mod enrichment;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod prompt_builder;
pub mod store;
pub mod tokens;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use consumer::DatasetReader;
pub use enrichment::Enricher;
pub use models::inference::AnalysisEngine;
pub use pipeline::{BatchRunner, BatchSummary};
pub use producer::ResultExporter;
pub use prompt_builder::PromptBuilder;
pub use store::Collector;
pub use types::{AnalysisReport, AnalysisResult, AppInfo, Verdict};
