//! # Cross-run statistics
//!
//! Per-metric aggregates over a set of run results. Percentiles use the
//! ceiling-rank rule on a sorted copy: `rank = ceil(p/100 * n)` clamped to
//! `[1, n]`, value at `sorted[rank - 1]`. The rank computation lives in one
//! function so a different convention stays a local change.

use std::collections::BTreeSet;

use serde::Serialize;

use af_api::RunResult;

/// Aggregates for one metric across runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub metric: String,
    /// Number of runs the metric was present (and numeric) in
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
}

/// Ceiling-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

/// Compute per-metric statistics over the union of final-metric keys.
/// Non-numeric values are skipped; a metric absent from every run yields no
/// entry.
pub fn metric_stats(runs: &[RunResult]) -> Vec<MetricStats> {
    let keys: BTreeSet<String> = runs
        .iter()
        .flat_map(|r| r.final_metrics.keys().cloned())
        .collect();

    let mut out = Vec::new();
    for key in keys {
        let mut values: Vec<f64> = runs
            .iter()
            .filter_map(|r| r.final_metrics.get(&key).and_then(|v| v.as_f64()))
            .collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        out.push(MetricStats {
            metric: key,
            count: n,
            min: values[0],
            max: values[n - 1],
            mean,
            std_dev: variance.sqrt(),
            p05: percentile(&values, 5.0),
            p50: percentile(&values, 50.0),
            p95: percentile(&values, 95.0),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_types::{MetricMap, MetricValue};

    fn run_with(volume: f64) -> RunResult {
        let mut metrics = MetricMap::new();
        let _ = metrics.insert("volume".into(), MetricValue::Number(volume));
        RunResult {
            run_id: "r".into(),
            scenario_name: "s".into(),
            seed: 1,
            ticks: 1,
            duration_ms: 0,
            success: true,
            failed_assertions: vec![],
            final_metrics: metrics,
            agent_stats: vec![],
            output_dir: ".".into(),
        }
    }

    #[test]
    fn stats_over_known_values() {
        let runs: Vec<RunResult> = [10.0, 20.0, 30.0, 40.0, 50.0]
            .iter()
            .map(|v| run_with(*v))
            .collect();
        let stats = metric_stats(&runs);
        assert_eq!(stats.len(), 1);

        let s = &stats[0];
        assert_eq!(s.metric, "volume");
        assert_eq!(s.count, 5);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 50.0);
        assert_eq!(s.mean, 30.0);
        // Ceiling rank: p05 → rank 1, p50 → rank 3, p95 → rank 5
        assert_eq!(s.p05, 10.0);
        assert_eq!(s.p50, 30.0);
        assert_eq!(s.p95, 50.0);
        assert!(s.min <= s.p50 && s.p50 <= s.max);
    }

    #[test]
    fn single_run_degenerates_cleanly() {
        let stats = metric_stats(&[run_with(7.0)]);
        let s = &stats[0];
        assert_eq!(s.min, 7.0);
        assert_eq!(s.p05, 7.0);
        assert_eq!(s.p95, 7.0);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn no_runs_no_stats() {
        assert!(metric_stats(&[]).is_empty());
    }
}
