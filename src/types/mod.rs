//! Type definitions for the analysis pipeline

pub mod app_info;
pub mod verdict;

pub use app_info::{AppInfo, Permissions, Review, Screenshots, NOT_AVAILABLE};
pub use verdict::{AnalysisDimension, AnalysisReport, AnalysisResult, Verdict};
