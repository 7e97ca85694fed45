//! Aggregation helpers over a finished analysis report

use crate::types::{AnalysisDimension, AnalysisReport, Verdict};
use std::collections::HashMap;

/// Counts of each verdict among the dimension results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictTally {
    pub fraud: usize,
    pub genuine: usize,
    pub suspected: usize,
    /// Dimensions with no usable result
    pub missing: usize,
}

impl VerdictTally {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let mut tally = Self::default();
        for (_, result) in report.dimension_results() {
            match result.verdict {
                Verdict::Fraud => tally.fraud += 1,
                Verdict::Genuine => tally.genuine += 1,
                Verdict::Suspected => tally.suspected += 1,
            }
        }
        tally.missing = AnalysisDimension::PRIORITY.len() - tally.answered();
        tally
    }

    /// Number of dimensions that produced a verdict
    pub fn answered(&self) -> usize {
        self.fraud + self.genuine + self.suspected
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Fraud => self.fraud,
            Verdict::Genuine => self.genuine,
            Verdict::Suspected => self.suspected,
        }
    }
}

/// Blends dimension verdicts into a fraud score using per-dimension weights.
///
/// The score only feeds logs and metrics; the overall verdict always comes
/// from the arbitration stage.
pub struct VerdictAggregator {
    weights: HashMap<AnalysisDimension, f64>,
}

impl VerdictAggregator {
    pub fn new(weights: HashMap<AnalysisDimension, f64>) -> Self {
        Self { weights }
    }

    /// Weighted fraud score in `0.0..=1.0`, `None` when no dimension answered.
    pub fn fraud_score(&self, report: &AnalysisReport) -> Option<f64> {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (dimension, result) in report.dimension_results() {
            let weight = self.weights.get(&dimension).copied().unwrap_or(0.1);
            weighted_sum += result.verdict.fraud_weight() * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            Some((weighted_sum / total_weight).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// First answered dimension in priority order
    /// (Developer > Images > Reviews > Description > Permissions).
    pub fn priority_verdict(report: &AnalysisReport) -> Option<(AnalysisDimension, Verdict)> {
        report
            .dimension_results()
            .next()
            .map(|(dimension, result)| (dimension, result.verdict))
    }

    /// Fraction of answered dimensions whose verdict matches the overall one.
    pub fn agreement(report: &AnalysisReport) -> Option<f64> {
        let overall = report.overall_analysis.as_ref()?.verdict;
        let tally = VerdictTally::from_report(report);
        if tally.answered() == 0 {
            return None;
        }
        Some(tally.count(overall) as f64 / tally.answered() as f64)
    }

    pub fn get_weights(&self) -> &HashMap<AnalysisDimension, f64> {
        &self.weights
    }
}

impl Default for VerdictAggregator {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(AnalysisDimension::Developer, 0.30);
        weights.insert(AnalysisDimension::Images, 0.25);
        weights.insert(AnalysisDimension::Reviews, 0.20);
        weights.insert(AnalysisDimension::Description, 0.15);
        weights.insert(AnalysisDimension::Permissions, 0.10);

        Self { weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisResult;

    fn result(verdict: Verdict) -> Option<AnalysisResult> {
        Some(AnalysisResult::new(verdict, "", 300))
    }

    fn mixed_report() -> AnalysisReport {
        AnalysisReport {
            developer_analysis: result(Verdict::Fraud),
            image_analysis: result(Verdict::Suspected),
            review_analysis: result(Verdict::Fraud),
            description_analysis: result(Verdict::Genuine),
            permissions_analysis: None,
            overall_analysis: result(Verdict::Fraud),
        }
    }

    #[test]
    fn test_tally() {
        let tally = VerdictTally::from_report(&mixed_report());
        assert_eq!(tally.fraud, 2);
        assert_eq!(tally.suspected, 1);
        assert_eq!(tally.genuine, 1);
        assert_eq!(tally.missing, 1);
        assert_eq!(tally.answered(), 4);
    }

    #[test]
    fn test_weighted_fraud_score() {
        let score = VerdictAggregator::default().fraud_score(&mixed_report()).unwrap();

        // (1.0*0.30 + 0.5*0.25 + 1.0*0.20 + 0.0*0.15) / 0.90
        assert!((score - 0.6944).abs() < 0.01);
    }

    #[test]
    fn test_empty_report_has_no_score() {
        let report = AnalysisReport::default();
        assert_eq!(VerdictAggregator::default().fraud_score(&report), None);
        assert_eq!(VerdictAggregator::agreement(&report), None);
        assert_eq!(VerdictAggregator::priority_verdict(&report), None);
    }

    #[test]
    fn test_priority_verdict_skips_missing() {
        let mut report = mixed_report();
        report.developer_analysis = None;

        assert_eq!(
            VerdictAggregator::priority_verdict(&report),
            Some((AnalysisDimension::Images, Verdict::Suspected))
        );
    }

    #[test]
    fn test_custom_weights() {
        let mut weights = HashMap::new();
        weights.insert(AnalysisDimension::Description, 1.0);
        let aggregator = VerdictAggregator::new(weights);
        assert_eq!(aggregator.get_weights().len(), 1);

        // Unweighted dimensions fall back to 0.1
        let score = aggregator.fraud_score(&mixed_report()).unwrap();
        assert!((score - 0.25 / 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_agreement() {
        let agreement = VerdictAggregator::agreement(&mixed_report()).unwrap();
        assert!((agreement - 0.5).abs() < 0.01);
    }
}
