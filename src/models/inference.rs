//! Multi-stage fraud analysis engine

use crate::metrics::PipelineMetrics;
use crate::models::gemini::TextGenerator;
use crate::prompt_builder::PromptBuilder;
use crate::types::{AnalysisDimension, AnalysisReport, AnalysisResult, AppInfo, Verdict};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Label used for the arbitration stage in logs and metrics
pub const OVERALL_STAGE: &str = "overall";

/// Runs the five independent dimension classifiers and the final
/// arbitration call for one app.
pub struct AnalysisEngine {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptBuilder,
    reason_limit: usize,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl AnalysisEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: PromptBuilder,
        reason_limit: usize,
    ) -> Self {
        Self {
            generator,
            prompts,
            reason_limit,
            metrics: None,
        }
    }

    /// Record call latencies and failures into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run every stage. A failed stage leaves its entry empty and never stops
    /// the others.
    pub async fn analyze(&self, app: &AppInfo) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        for dimension in AnalysisDimension::EXECUTION_ORDER {
            let result = self.analyze_dimension(dimension, app).await;
            report.set(dimension, result);
        }

        report.overall_analysis = self.analyze_overall(&report.dimensions_value(), app).await;

        info!(
            app_id = %app.app_id,
            overall = ?report.overall_analysis.as_ref().map(|r| r.verdict),
            "Analysis complete"
        );
        report
    }

    /// Classify a single dimension; `None` when the call or the parse fails.
    pub async fn analyze_dimension(
        &self,
        dimension: AnalysisDimension,
        app: &AppInfo,
    ) -> Option<AnalysisResult> {
        let prompt = self.prompts.for_dimension(dimension, app);
        self.run_stage(dimension.as_str(), &app.app_id, &prompt).await
    }

    /// Merge the dimension results into one overall verdict.
    pub async fn analyze_overall(&self, results: &Value, app: &AppInfo) -> Option<AnalysisResult> {
        let prompt = self.prompts.overall(results, app);
        self.run_stage(OVERALL_STAGE, &app.app_id, &prompt).await
    }

    async fn run_stage(&self, stage: &str, app_id: &str, prompt: &str) -> Option<AnalysisResult> {
        let start = Instant::now();
        let response = self
            .generator
            .generate_json(&PromptBuilder::with_preamble(prompt))
            .await;
        let elapsed = start.elapsed();

        let result = match response {
            Ok(text) => {
                let parsed = parse_verdict(&text, self.reason_limit);
                if parsed.is_none() {
                    warn!(
                        app_id = %app_id,
                        stage = %stage,
                        response = %text,
                        "Response is not a valid verdict, leaving result empty"
                    );
                }
                parsed
            }
            Err(e) => {
                warn!(app_id = %app_id, stage = %stage, error = %e, "Analysis call failed");
                None
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_stage(stage, elapsed, result.is_some());
        }

        debug!(
            app_id = %app_id,
            stage = %stage,
            verdict = ?result.as_ref().map(|r| r.verdict),
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage finished"
        );
        result
    }
}

/// Parse a model response into a verdict.
///
/// Accepts bare JSON or JSON surrounded by prose or code fences. Anything
/// that is not an object with a recognized `type` yields `None`.
pub fn parse_verdict(text: &str, reason_limit: usize) -> Option<AnalysisResult> {
    let payload = extract_json_block(text).unwrap_or(text);
    let value: Value = serde_json::from_str(payload).ok()?;

    // Some responses wrap the object in a single-element array.
    let object = match &value {
        Value::Array(items) if items.len() == 1 => items[0].as_object()?,
        other => other.as_object()?,
    };

    let verdict = Verdict::parse(object.get("type")?.as_str()?)?;
    let reason = match object.get("reason") {
        Some(Value::String(reason)) => reason.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Some(AnalysisResult::new(verdict, &reason, reason_limit))
}

fn extract_json_block(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&input[start..=end])
}
