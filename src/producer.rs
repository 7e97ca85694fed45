//! File exporter for app records, analysis reports and batch predictions

use crate::types::{AnalysisReport, AppInfo, Verdict};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Columns of the tabular prediction export
pub const PREDICTION_COLUMNS: [&str; 4] = ["app_id", "url", "prediction", "reason"];

pub const APP_DETAILS_FILE: &str = "app_details.json";
pub const RESULTS_JSON_FILE: &str = "results.json";
pub const RESULTS_CSV_FILE: &str = "results.csv";

/// `dataset_<QUERY>_<COUNTRY>` with non-alphanumerics folded to `_`.
pub fn dataset_name(query: &str, country: &str) -> String {
    let slug: String = query
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("dataset_{}_{}", slug, country.trim().to_ascii_uppercase())
}

/// One batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub app_id: String,
    pub url: String,
    pub prediction: Verdict,
    pub reason: String,
    /// The five dimension results
    pub other: Value,
}

impl PredictionRow {
    /// Row for an app whose overall verdict is present.
    pub fn from_report(app: &AppInfo, report: &AnalysisReport) -> Option<Self> {
        let overall = report.overall_analysis.as_ref()?;
        Some(Self {
            app_id: app.app_id.clone(),
            url: app.url.clone(),
            prediction: overall.verdict,
            reason: overall.reason.clone(),
            other: report.dimensions_value(),
        })
    }
}

/// Writes pipeline outputs below one directory
#[derive(Debug, Clone)]
pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn prepare(&self, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;
        Ok(self.output_dir.join(file_name))
    }

    /// Pretty JSON dump of any value.
    pub fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), "Output written");
        Ok(path)
    }

    pub fn write_app_details(&self, app: &AppInfo) -> Result<PathBuf> {
        self.write_json(APP_DETAILS_FILE, app)
    }

    pub fn write_dataset(&self, name: &str, apps: &[AppInfo]) -> Result<PathBuf> {
        self.write_json(&format!("{}.json", name), apps)
    }

    pub fn write_expanded(&self, dataset_name: &str, apps: &[AppInfo]) -> Result<PathBuf> {
        self.write_json(&format!("{}_expanded.json", dataset_name), apps)
    }

    /// Results record of a single analyzed app.
    pub fn write_report(&self, report: &AnalysisReport) -> Result<PathBuf> {
        self.write_json(RESULTS_JSON_FILE, report)
    }

    /// `results.csv` with exactly [`PREDICTION_COLUMNS`] and `results.json`
    /// with the full records.
    pub fn write_predictions(&self, rows: &[PredictionRow]) -> Result<(PathBuf, PathBuf)> {
        let csv_path = self.prepare(RESULTS_CSV_FILE)?;
        let mut writer = csv::Writer::from_path(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;

        writer
            .write_record(PREDICTION_COLUMNS)
            .context("Failed to write CSV header")?;
        for row in rows {
            writer
                .write_record([
                    row.app_id.as_str(),
                    row.url.as_str(),
                    row.prediction.as_str(),
                    row.reason.as_str(),
                ])
                .with_context(|| format!("Failed to write CSV row for {}", row.app_id))?;
        }
        writer.flush().context("Failed to flush CSV output")?;
        info!(path = %csv_path.display(), rows = rows.len(), "Predictions written");

        let json_path = self.write_json(RESULTS_JSON_FILE, rows)?;
        Ok((csv_path, json_path))
    }
}
