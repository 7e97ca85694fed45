//! Batch driver: enrich every app of a dataset, analyze it, export predictions

use crate::enrichment::Enricher;
use crate::metrics::PipelineMetrics;
use crate::models::aggregator::VerdictAggregator;
use crate::models::inference::AnalysisEngine;
use crate::producer::{PredictionRow, ResultExporter};
use crate::types::AppInfo;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SUMMARY_FILE: &str = "batch_summary.json";

/// Outcome of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub dataset: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub enriched: usize,
    pub predicted: usize,
    pub failed: usize,
}

pub struct BatchRunner {
    enricher: Enricher,
    engine: AnalysisEngine,
    exporter: ResultExporter,
    aggregator: VerdictAggregator,
    metrics: Arc<PipelineMetrics>,
}

impl BatchRunner {
    pub fn new(
        enricher: Enricher,
        engine: AnalysisEngine,
        exporter: ResultExporter,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            enricher,
            engine,
            exporter,
            aggregator: VerdictAggregator::default(),
            metrics,
        }
    }

    /// Enrich each app in turn; failed items are logged and dropped.
    pub async fn enrich_all(&self, apps: Vec<AppInfo>) -> Vec<AppInfo> {
        let mut expanded = Vec::with_capacity(apps.len());

        for (i, app) in apps.into_iter().enumerate() {
            let app_id = app.app_id.clone();
            info!(index = i, app_id = %app_id, "Enriching app");

            match self.enricher.add_info(app).await {
                Ok(app) => expanded.push(app),
                Err(e) => {
                    error!(
                        index = i,
                        app_id = %app_id,
                        error = %format!("{:#}", e),
                        "Enrichment failed, skipping app"
                    );
                    self.metrics.record_failure();
                }
            }
        }

        expanded
    }

    /// Analyze each app in turn; apps without an overall verdict are skipped.
    pub async fn analyze_all(&self, apps: &[AppInfo]) -> Vec<PredictionRow> {
        let mut rows = Vec::with_capacity(apps.len());

        for (i, app) in apps.iter().enumerate() {
            info!(index = i, app_id = %app.app_id, "Analyzing app");
            let report = self.engine.analyze(app).await;

            let Some(row) = PredictionRow::from_report(app, &report) else {
                warn!(
                    index = i,
                    app_id = %app.app_id,
                    highest_priority = ?VerdictAggregator::priority_verdict(&report),
                    "No overall verdict, skipping app"
                );
                self.metrics.record_failure();
                continue;
            };

            let fraud_score = self.aggregator.fraud_score(&report);
            self.metrics.record_app(
                row.prediction,
                fraud_score,
                VerdictAggregator::agreement(&report),
            );
            info!(
                index = i,
                app_id = %row.app_id,
                prediction = %row.prediction,
                fraud_score = ?fraud_score,
                "Prediction recorded"
            );
            rows.push(row);
        }

        rows
    }

    /// Full batch: enrich, write the expanded dataset, analyze, export.
    pub async fn run(&self, dataset_name: &str, apps: Vec<AppInfo>) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = apps.len();
        info!(run_id = %run_id, dataset = %dataset_name, apps = total, "Starting batch");

        let expanded = self.enrich_all(apps).await;
        self.exporter.write_expanded(dataset_name, &expanded)?;

        let rows = self.analyze_all(&expanded).await;
        self.exporter.write_predictions(&rows)?;

        let summary = BatchSummary {
            run_id,
            dataset: dataset_name.to_string(),
            started_at,
            finished_at: Utc::now(),
            total,
            enriched: expanded.len(),
            predicted: rows.len(),
            failed: total - rows.len(),
        };
        self.exporter.write_json(SUMMARY_FILE, &summary)?;

        info!(
            run_id = %run_id,
            predicted = summary.predicted,
            failed = summary.failed,
            "Batch finished"
        );
        self.metrics.print_summary();
        Ok(summary)
    }
}
