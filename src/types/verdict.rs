//! Verdict data structures produced by the analysis stages

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Classification returned by every analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Fraud,
    Genuine,
    Suspected,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::Fraud, Verdict::Genuine, Verdict::Suspected];

    /// Parse a verdict literal, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fraud" => Some(Verdict::Fraud),
            "genuine" => Some(Verdict::Genuine),
            "suspected" => Some(Verdict::Suspected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fraud => "fraud",
            Verdict::Genuine => "genuine",
            Verdict::Suspected => "suspected",
        }
    }

    /// Numeric fraud weight used when blending dimension verdicts.
    pub fn fraud_weight(&self) -> f64 {
        match self {
            Verdict::Fraud => 1.0,
            Verdict::Suspected => 0.5,
            Verdict::Genuine => 0.0,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured verdict with the model's rationale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "type")]
    pub verdict: Verdict,
    #[serde(default)]
    pub reason: String,
}

impl AnalysisResult {
    /// Create a result, truncating the reason to `reason_limit` characters.
    pub fn new(verdict: Verdict, reason: &str, reason_limit: usize) -> Self {
        let reason = reason.trim();
        let reason = match reason.char_indices().nth(reason_limit) {
            Some((idx, _)) => reason[..idx].to_string(),
            None => reason.to_string(),
        };
        Self { verdict, reason }
    }
}

/// The fixed analysis dimensions, listed in arbitration priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDimension {
    Developer,
    Images,
    Reviews,
    Description,
    Permissions,
}

impl AnalysisDimension {
    /// Highest priority first.
    pub const PRIORITY: [AnalysisDimension; 5] = [
        AnalysisDimension::Developer,
        AnalysisDimension::Images,
        AnalysisDimension::Reviews,
        AnalysisDimension::Description,
        AnalysisDimension::Permissions,
    ];

    /// Order in which the analyzer issues its calls.
    pub const EXECUTION_ORDER: [AnalysisDimension; 5] = [
        AnalysisDimension::Images,
        AnalysisDimension::Reviews,
        AnalysisDimension::Developer,
        AnalysisDimension::Description,
        AnalysisDimension::Permissions,
    ];

    /// Key of this dimension in the results record
    pub fn report_key(&self) -> &'static str {
        match self {
            AnalysisDimension::Developer => "developer_analysis",
            AnalysisDimension::Images => "image_analysis",
            AnalysisDimension::Reviews => "review_analysis",
            AnalysisDimension::Description => "description_analysis",
            AnalysisDimension::Permissions => "permissions_analysis",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisDimension::Developer => "developer",
            AnalysisDimension::Images => "images",
            AnalysisDimension::Reviews => "reviews",
            AnalysisDimension::Description => "description",
            AnalysisDimension::Permissions => "permissions",
        }
    }
}

impl fmt::Display for AnalysisDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results record for one app: one optional entry per dimension plus the
/// overall arbitration. Absent entries serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub image_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub review_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub developer_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub description_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub permissions_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub overall_analysis: Option<AnalysisResult>,
}

impl AnalysisReport {
    pub fn get(&self, dimension: AnalysisDimension) -> Option<&AnalysisResult> {
        match dimension {
            AnalysisDimension::Developer => self.developer_analysis.as_ref(),
            AnalysisDimension::Images => self.image_analysis.as_ref(),
            AnalysisDimension::Reviews => self.review_analysis.as_ref(),
            AnalysisDimension::Description => self.description_analysis.as_ref(),
            AnalysisDimension::Permissions => self.permissions_analysis.as_ref(),
        }
    }

    pub fn set(&mut self, dimension: AnalysisDimension, result: Option<AnalysisResult>) {
        let slot = match dimension {
            AnalysisDimension::Developer => &mut self.developer_analysis,
            AnalysisDimension::Images => &mut self.image_analysis,
            AnalysisDimension::Reviews => &mut self.review_analysis,
            AnalysisDimension::Description => &mut self.description_analysis,
            AnalysisDimension::Permissions => &mut self.permissions_analysis,
        };
        *slot = result;
    }

    /// Answered dimensions, highest priority first.
    pub fn dimension_results(
        &self,
    ) -> impl Iterator<Item = (AnalysisDimension, &AnalysisResult)> + '_ {
        AnalysisDimension::PRIORITY
            .into_iter()
            .filter_map(move |dimension| self.get(dimension).map(|result| (dimension, result)))
    }

    /// The five dimension entries as a JSON object, in execution order.
    pub fn dimensions_value(&self) -> Value {
        let mut map = Map::new();
        for dimension in AnalysisDimension::EXECUTION_ORDER {
            let entry = self
                .get(dimension)
                .and_then(|result| serde_json::to_value(result).ok())
                .unwrap_or(Value::Null);
            map.insert(dimension.report_key().to_string(), entry);
        }
        Value::Object(map)
    }
}
