//! # Seed sweep
//!
//! Runs one scenario across many seeds, each with a fresh pack and its own
//! artifact directory, then aggregates: per-metric statistics, pass/fail
//! counts, the three worst runs by agent success rate, `summary.csv`, and
//! `report.md`.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use af_api::RunResult;
use af_artifacts::csv::escape_field;
use af_engine::{run, RunOptions, Scenario};
use af_report::markdown::{fmt_num, table};
use af_types::{ForgeError, ForgeResult};

use crate::stats::{metric_stats, MetricStats};

/// How many tail-risk runs the report highlights.
const WORST_RUN_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub seeds: Vec<u64>,
    pub ticks: Option<u64>,
    pub out_dir: PathBuf,
    pub ci: bool,
    /// Fan-out hint; runs execute sequentially either way, so aggregation
    /// order is always seed order
    pub parallel: Option<u32>,
}

pub struct SweepResult {
    pub sweep_dir: PathBuf,
    pub runs: Vec<RunResult>,
    pub stats: Vec<MetricStats>,
    /// Seeds of the worst runs, ascending by agent success rate
    pub worst_seeds: Vec<u64>,
    pub passed: usize,
    pub failed: usize,
}

impl SweepResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run the sweep. Fatal (infrastructure) errors abort the whole sweep;
/// assertion failures are aggregated, not propagated.
pub fn run_sweep(scenario: &Scenario, options: &SweepOptions) -> ForgeResult<SweepResult> {
    if options.seeds.is_empty() {
        return Err(ForgeError::InvalidScenario(
            "sweep requires at least one seed".into(),
        ));
    }
    if let Some(fan_out) = options.parallel {
        info!(fan_out, "parallel fan-out requested; running sequentially");
    }

    let sweep_dir = options.out_dir.join(format!("{}-sweep", scenario.name));
    fs::create_dir_all(&sweep_dir).map_err(|e| {
        ForgeError::ArtifactWrite(format!("failed to create sweep dir {:?}: {}", sweep_dir, e))
    })?;

    let mut runs = Vec::with_capacity(options.seeds.len());
    for seed in &options.seeds {
        let run_options = RunOptions {
            seed: Some(*seed),
            ticks: options.ticks,
            tick_seconds: None,
            out_dir: sweep_dir.join("runs").join(format!("seed_{}", seed)),
            ci: options.ci,
            verbose: false,
        };
        info!(seed, scenario = %scenario.name, "sweep run");
        runs.push(run(scenario, &run_options)?);
    }

    let stats = metric_stats(&runs);
    let passed = runs.iter().filter(|r| r.success).count();
    let failed = runs.len() - passed;

    let mut worst_order: Vec<usize> = (0..runs.len()).collect();
    worst_order.sort_by(|a, b| runs[*a].success_rate().total_cmp(&runs[*b].success_rate()));
    let worst_seeds: Vec<u64> = worst_order
        .iter()
        .take(WORST_RUN_COUNT)
        .map(|i| runs[*i].seed)
        .collect();

    write_summary_csv(&sweep_dir, &runs)?;
    write_report(&sweep_dir, scenario, options, &runs, &stats, &worst_order)?;

    Ok(SweepResult {
        sweep_dir,
        runs,
        stats,
        worst_seeds,
        passed,
        failed,
    })
}

/// `summary.csv`: one row per seed, in seed order.
fn write_summary_csv(sweep_dir: &PathBuf, runs: &[RunResult]) -> ForgeResult<()> {
    let metric_keys: BTreeSet<String> = runs
        .iter()
        .flat_map(|r| r.final_metrics.keys().cloned())
        .collect();

    let mut out = String::from("seed,success,successRate,failedAssertions");
    for key in &metric_keys {
        out.push(',');
        out.push_str(&escape_field(key));
    }
    out.push('\n');

    for run in runs {
        out.push_str(&format!(
            "{},{},{},{}",
            run.seed,
            run.success,
            fmt_num(run.success_rate()),
            run.failed_assertions.len()
        ));
        for key in &metric_keys {
            out.push(',');
            if let Some(value) = run.final_metrics.get(key) {
                out.push_str(&escape_field(&value.to_csv_field()));
            }
        }
        out.push('\n');
    }

    fs::write(sweep_dir.join("summary.csv"), out)
        .map_err(|e| ForgeError::ArtifactWrite(format!("failed to write summary.csv: {}", e)))
}

fn write_report(
    sweep_dir: &PathBuf,
    scenario: &Scenario,
    options: &SweepOptions,
    runs: &[RunResult],
    stats: &[MetricStats],
    worst_order: &[usize],
) -> ForgeResult<()> {
    let mut out = String::new();
    out.push_str(&format!("# Sweep Report: {}\n\n", scenario.name));

    out.push_str("## Configuration\n\n");
    out.push_str(&table(
        &["field", "value"],
        &[
            vec!["pack".into(), scenario.pack.label().to_string()],
            vec![
                "seeds".into(),
                options
                    .seeds
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ],
            vec![
                "ticks".into(),
                options.ticks.unwrap_or(scenario.ticks).to_string(),
            ],
            vec!["tickSeconds".into(), format!("{}", scenario.tick_seconds)],
        ],
    ));
    out.push('\n');

    let passed = runs.iter().filter(|r| r.success).count();
    out.push_str("## Results\n\n");
    out.push_str(&format!(
        "{} of {} runs passed, {} failed.\n\n",
        passed,
        runs.len(),
        runs.len() - passed
    ));

    out.push_str("## Metric Statistics\n\n");
    if stats.is_empty() {
        out.push_str("No numeric metrics captured.\n");
    } else {
        let rows: Vec<Vec<String>> = stats
            .iter()
            .map(|s| {
                vec![
                    s.metric.clone(),
                    fmt_num(s.min),
                    fmt_num(s.p05),
                    fmt_num(s.p50),
                    fmt_num(s.p95),
                    fmt_num(s.max),
                    fmt_num(s.mean),
                    fmt_num(s.std_dev),
                ]
            })
            .collect();
        out.push_str(&table(
            &["metric", "min", "p05", "p50", "p95", "max", "mean", "stdDev"],
            &rows,
        ));
    }
    out.push('\n');

    out.push_str("## Tail Risk\n\n");
    out.push_str("Worst runs by agent success rate:\n\n");
    let rows: Vec<Vec<String>> = worst_order
        .iter()
        .take(WORST_RUN_COUNT)
        .map(|i| {
            let run = &runs[*i];
            let failures = if run.failed_assertions.is_empty() {
                "-".to_string()
            } else {
                run.failed_assertions
                    .iter()
                    .map(|f| f.message.clone())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            vec![
                run.seed.to_string(),
                fmt_num(run.success_rate()),
                failures,
            ]
        })
        .collect();
    out.push_str(&table(&["seed", "successRate", "failedAssertions"], &rows));

    fs::write(sweep_dir.join("report.md"), out)
        .map_err(|e| ForgeError::ArtifactWrite(format!("failed to write report.md: {}", e)))
}
