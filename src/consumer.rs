//! Dataset reader feeding app records into the batch driver

use crate::types::AppInfo;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads a dataset file: a JSON array of app records
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Raw records of the dataset.
    pub fn load(&self) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read dataset {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Dataset {} is not valid JSON", self.path.display()))?;

        let records = match value {
            Value::Array(records) => records,
            Value::Object(_) => vec![value],
            _ => anyhow::bail!("Dataset {} must hold app records", self.path.display()),
        };
        if records.is_empty() {
            anyhow::bail!("Dataset {} is empty", self.path.display());
        }
        Ok(records)
    }

    /// Typed records; malformed ones are logged and skipped.
    pub fn load_apps(&self) -> Result<Vec<AppInfo>> {
        let records = self.load()?;
        let total = records.len();

        let apps: Vec<AppInfo> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| match serde_json::from_value::<AppInfo>(record) {
                Ok(app) => Some(app),
                Err(e) => {
                    warn!(index = i, error = %e, "Skipping malformed dataset record");
                    None
                }
            })
            .collect();

        info!(
            path = %self.path.display(),
            loaded = apps.len(),
            total = total,
            "Dataset loaded"
        );
        Ok(apps)
    }

    /// Dataset name used for derived output files (file stem).
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
