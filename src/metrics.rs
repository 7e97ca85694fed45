//! Run statistics for the analysis pipeline.

use crate::types::Verdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for a pipeline run
pub struct PipelineMetrics {
    /// Apps that produced an overall verdict
    pub apps_processed: AtomicU64,
    /// Apps skipped because a step failed
    pub apps_failed: AtomicU64,
    /// Overall verdicts by type
    verdicts: RwLock<HashMap<Verdict, u64>>,
    /// Per-stage call durations (in milliseconds)
    stage_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Per-stage calls with no usable result
    stage_failures: RwLock<HashMap<String, u64>>,
    /// Fraud score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// How often dimension verdicts match the overall verdict
    agreements: RwLock<Vec<f64>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            apps_processed: AtomicU64::new(0),
            apps_failed: AtomicU64::new(0),
            verdicts: RwLock::new(HashMap::new()),
            stage_times: RwLock::new(HashMap::new()),
            stage_failures: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            agreements: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one analysis call.
    pub fn record_stage(&self, stage: &str, duration: Duration, succeeded: bool) {
        if let Ok(mut times) = self.stage_times.write() {
            let stage_times = times.entry(stage.to_string()).or_default();
            stage_times.push(duration.as_millis() as u64);

            // Keep only the last 1000 per stage
            if stage_times.len() > 1000 {
                stage_times.drain(0..500);
            }
        }
        if let Ok(mut failures) = self.stage_failures.write() {
            let count = failures.entry(stage.to_string()).or_insert(0);
            if !succeeded {
                *count += 1;
            }
        }
    }

    /// Record an app that reached an overall verdict.
    pub fn record_app(&self, verdict: Verdict, fraud_score: Option<f64>, agreement: Option<f64>) {
        self.apps_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut verdicts) = self.verdicts.write() {
            *verdicts.entry(verdict).or_insert(0) += 1;
        }

        if let Some(score) = fraud_score {
            let bucket = (score * 10.0).clamp(0.0, 9.0) as usize;
            if let Ok(mut buckets) = self.score_buckets.write() {
                buckets[bucket] += 1;
            }
        }

        if let Some(agreement) = agreement {
            if let Ok(mut agreements) = self.agreements.write() {
                agreements.push(agreement);
            }
        }
    }

    /// Record an app that was skipped.
    pub fn record_failure(&self) {
        self.apps_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stage_stats(&self) -> HashMap<String, StageStats> {
        let failures = self
            .stage_failures
            .read()
            .map(|f| f.clone())
            .unwrap_or_default();
        let Ok(times) = self.stage_times.read() else {
            return HashMap::new();
        };

        times
            .iter()
            .filter(|(_, stage_times)| !stage_times.is_empty())
            .map(|(stage, stage_times)| {
                let mut sorted = stage_times.clone();
                sorted.sort_unstable();
                let count = sorted.len();
                let sum: u64 = sorted.iter().sum();

                (
                    stage.clone(),
                    StageStats {
                        calls: count as u64,
                        failures: failures.get(stage).copied().unwrap_or(0),
                        mean_ms: sum / count as u64,
                        p50_ms: sorted[count / 2],
                        max_ms: sorted[count - 1],
                    },
                )
            })
            .collect()
    }

    pub fn get_verdicts(&self) -> HashMap<Verdict, u64> {
        self.verdicts.read().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn get_avg_agreement(&self) -> f64 {
        let Ok(agreements) = self.agreements.read() else {
            return 0.0;
        };
        if agreements.is_empty() {
            return 0.0;
        }
        agreements.iter().sum::<f64>() / agreements.len() as f64
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.apps_processed.load(Ordering::Relaxed);
        let failed = self.apps_failed.load(Ordering::Relaxed);
        let verdicts = self.get_verdicts();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             APP FRAUD ANALYSIS - RUN SUMMARY                 ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Apps Analyzed: {:>6}  │  Skipped: {:>6}  │  Elapsed: {:>6}s ║",
            processed,
            failed,
            self.elapsed().as_secs()
        );
        info!(
            "║ Dimension/Overall Agreement: {:>5.1}%                          ║",
            self.get_avg_agreement() * 100.0
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Overall Verdicts:                                            ║");
        for verdict in Verdict::ALL {
            let count = verdicts.get(&verdict).copied().unwrap_or(0);
            let pct = if processed > 0 {
                (count as f64 / processed as f64) * 100.0
            } else {
                0.0
            };
            info!(
                "║   {:10}: {:>6} ({:>5.1}%)                                ║",
                verdict.as_str(),
                count,
                pct
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Weighted Fraud Score Distribution:                           ║");
        let score_dist = self.get_score_distribution();
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let mut stages: Vec<(String, StageStats)> = self.get_stage_stats().into_iter().collect();
        stages.sort_by(|a, b| a.0.cmp(&b.0));
        if !stages.is_empty() {
            info!("Stage Call Times (ms):");
            for (stage, stats) in &stages {
                info!(
                    "  {}: mean={} p50={} max={} (calls={}, failed={})",
                    stage, stats.mean_ms, stats.p50_ms, stats.max_ms, stats.calls, stats.failures
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-stage call statistics
#[derive(Debug, Clone, Default)]
pub struct StageStats {
    pub calls: u64,
    pub failures: u64,
    pub mean_ms: u64,
    pub p50_ms: u64,
    pub max_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_app(Verdict::Fraud, Some(0.9), Some(1.0));
        metrics.record_app(Verdict::Genuine, Some(0.05), Some(0.6));
        metrics.record_failure();

        assert_eq!(metrics.apps_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.apps_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_verdicts()[&Verdict::Fraud], 1);
        assert_eq!(metrics.get_score_distribution()[9], 1);
        assert_eq!(metrics.get_score_distribution()[0], 1);
        assert!((metrics.get_avg_agreement() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_stage_times_are_bounded() {
        let metrics = PipelineMetrics::new();
        for i in 0..1001 {
            metrics.record_stage("developer", Duration::from_millis(i), true);
        }

        let stats = metrics.get_stage_stats();
        assert_eq!(stats["developer"].calls, 501);
        assert_eq!(stats["developer"].max_ms, 1000);
    }

    #[test]
    fn test_stage_stats() {
        let metrics = PipelineMetrics::new();

        metrics.record_stage("reviews", Duration::from_millis(100), true);
        metrics.record_stage("reviews", Duration::from_millis(300), false);
        metrics.record_stage("images", Duration::from_millis(50), true);

        let stats = metrics.get_stage_stats();
        assert_eq!(stats["reviews"].calls, 2);
        assert_eq!(stats["reviews"].failures, 1);
        assert_eq!(stats["reviews"].mean_ms, 200);
        assert_eq!(stats["reviews"].max_ms, 300);
        assert_eq!(stats["images"].failures, 0);
    }
}
