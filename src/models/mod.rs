//! Generative model access and the staged analysis built on it

pub mod aggregator;
pub mod gemini;
pub mod inference;

pub use aggregator::{VerdictAggregator, VerdictTally};
pub use gemini::{GeminiClient, ImageDescriber, TextGenerator};
pub use inference::AnalysisEngine;
