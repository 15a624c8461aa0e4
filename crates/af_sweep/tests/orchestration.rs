//! Sweep, matrix, compare, and report behavior over the toy-market
//! reference scenario.

use std::env::temp_dir;
use std::fs;
use std::path::PathBuf;

use af_engine::{run, RunOptions};
use af_packs::{toy_scenario, toy_scenario_with_faulty};
use af_report::compare::compare_runs;
use af_report::generate_run_report;
use af_sweep::{
    parse_seed_set, run_matrix, run_sweep, MatrixOptions, ScenarioOverrides, SweepOptions,
    VariantSpec,
};

fn out_dir(tag: &str) -> PathBuf {
    temp_dir().join(format!("af_sweep_it_{}_{}", std::process::id(), tag))
}

#[test]
fn toy_run_passes_volume_assertion() {
    // The stock toy scenario asserts gt totalVolume 0.
    let scenario = toy_scenario(1337, 20).unwrap();
    let options = RunOptions {
        out_dir: out_dir("toy_run"),
        ci: true,
        ..RunOptions::default()
    };
    let result = run(&scenario, &options).unwrap();
    assert!(result.success, "{:?}", result.failed_assertions);
    assert!(result.final_metrics.get("totalVolume").unwrap().as_f64().unwrap() > 0.0);
}

#[test]
fn toy_runs_are_reproducible() {
    let options = RunOptions {
        out_dir: out_dir("toy_repro"),
        ci: true,
        ..RunOptions::default()
    };

    let first = run(&toy_scenario(12345, 10).unwrap(), &options).unwrap();
    let csv_first =
        fs::read_to_string(PathBuf::from(&first.output_dir).join("metrics.csv")).unwrap();
    let actions_first =
        fs::read_to_string(PathBuf::from(&first.output_dir).join("actions.ndjson")).unwrap();

    let second = run(&toy_scenario(12345, 10).unwrap(), &options).unwrap();
    let csv_second =
        fs::read_to_string(PathBuf::from(&second.output_dir).join("metrics.csv")).unwrap();
    let actions_second =
        fs::read_to_string(PathBuf::from(&second.output_dir).join("actions.ndjson")).unwrap();

    assert_eq!(csv_first, csv_second);

    // Action ids must be identical sequences (wall-clock fields may differ).
    let ids = |body: &str| -> Vec<String> {
        body.lines()
            .filter_map(|line| {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                v["action"]["id"].as_str().map(String::from)
            })
            .collect()
    };
    assert_eq!(ids(&actions_first), ids(&actions_second));
}

#[test]
fn sweep_emits_summary_and_stats_report() {
    let scenario = toy_scenario(1337, 5).unwrap();
    let options = SweepOptions {
        seeds: parse_seed_set("1..5").unwrap(),
        ticks: Some(5),
        out_dir: out_dir("sweep"),
        ci: true,
        parallel: None,
    };
    let result = run_sweep(&scenario, &options).unwrap();

    assert_eq!(result.runs.len(), 5);
    assert_eq!(result.worst_seeds.len(), 3);

    // summary.csv: header + one row per seed.
    let summary = fs::read_to_string(result.sweep_dir.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 6);
    assert!(summary.starts_with("seed,success,"));

    let report = fs::read_to_string(result.sweep_dir.join("report.md")).unwrap();
    assert!(report.contains("## Metric Statistics"));
    assert!(report.contains("## Tail Risk"));

    for stats in &result.stats {
        assert!(stats.min <= stats.p50, "metric {}", stats.metric);
        assert!(stats.p50 <= stats.max, "metric {}", stats.metric);
        assert!(stats.p05 <= stats.p95, "metric {}", stats.metric);
    }
}

#[test]
fn matrix_compares_variants_pairwise() {
    let base = toy_scenario(1337, 5).unwrap();
    let variants = vec![
        VariantSpec::new("baseline"),
        VariantSpec::new("modified").overrides(ScenarioOverrides {
            ticks: Some(3),
            ..ScenarioOverrides::default()
        }),
    ];
    let options = MatrixOptions {
        seeds: parse_seed_set("1..2").unwrap(),
        ticks: None,
        out_dir: out_dir("matrix"),
        ci: true,
    };
    let result = run_matrix(&base, &variants, &options).unwrap();

    assert_eq!(result.variants.len(), 2);
    assert_eq!(result.variants[0].runs.len(), 2);
    assert_eq!(result.pairwise.len(), 1);

    let pair = &result.pairwise[0];
    assert_eq!(pair.a, "baseline");
    assert_eq!(pair.b, "modified");
    let volume = pair
        .metrics
        .iter()
        .find(|m| m.metric == "totalVolume")
        .expect("averaged totalVolume in pairwise comparison");
    // Fewer ticks mean less volume: a signed, negative change.
    assert!(volume.delta < 0.0);
    assert!(volume.percent_change < 0.0);

    let report = fs::read_to_string(result.matrix_dir.join("report.md")).unwrap();
    assert!(report.contains("## baseline vs modified"));
    assert!(report.contains("percentChange"));
}

#[test]
fn comparing_a_run_to_itself_is_clean() {
    let scenario = toy_scenario(99, 8).unwrap();
    let options = RunOptions {
        out_dir: out_dir("self_compare"),
        ci: true,
        ..RunOptions::default()
    };
    let result = run(&scenario, &options).unwrap();
    let dir = PathBuf::from(&result.output_dir);

    let comparison = compare_runs(&dir, &dir, 5.0).unwrap();
    assert_eq!(comparison.difference_count(), 0);
    assert!(comparison.deterministically_equivalent);
    assert_eq!(comparison.fingerprint_a, comparison.fingerprint_b);
}

#[test]
fn run_report_is_idempotent() {
    let scenario = toy_scenario(7, 6).unwrap();
    let options = RunOptions {
        out_dir: out_dir("report"),
        ci: true,
        ..RunOptions::default()
    };
    let result = run(&scenario, &options).unwrap();
    let dir = PathBuf::from(&result.output_dir);

    let first = generate_run_report(&dir).unwrap();
    let second = generate_run_report(&dir).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("## Final Metrics"));
    assert!(first.contains("## Agent Statistics"));
}

#[test]
fn faulty_agents_drag_down_tail_risk() {
    let scenario = toy_scenario_with_faulty(5, 6).unwrap();
    let options = SweepOptions {
        seeds: parse_seed_set("1,2,3").unwrap(),
        ticks: None,
        out_dir: out_dir("faulty"),
        ci: true,
        parallel: None,
    };
    let result = run_sweep(&scenario, &options).unwrap();

    // Every run carries the always-failing agent, so no run has a perfect
    // success rate.
    for run in &result.runs {
        assert!(run.success_rate() < 1.0, "seed {}", run.seed);
        let faulty = run
            .agent_stats
            .iter()
            .find(|s| s.agent_type == "faulty")
            .unwrap();
        assert_eq!(faulty.failed, run.ticks);
        assert_eq!(faulty.succeeded, 0);
    }
    assert_eq!(result.worst_seeds.len(), 3);
}

#[test]
fn comparing_different_seeds_finds_differences() {
    let options_a = RunOptions {
        seed: Some(1),
        out_dir: out_dir("diff_a"),
        ci: true,
        ..RunOptions::default()
    };
    let options_b = RunOptions {
        seed: Some(2),
        out_dir: out_dir("diff_b"),
        ci: true,
        ..RunOptions::default()
    };
    let scenario = toy_scenario(1, 15).unwrap();
    let run_a = run(&scenario, &options_a).unwrap();
    let run_b = run(&scenario, &options_b).unwrap();

    let comparison = compare_runs(
        &PathBuf::from(&run_a.output_dir),
        &PathBuf::from(&run_b.output_dir),
        5.0,
    )
    .unwrap();

    assert!(!comparison.deterministically_equivalent);
    assert!(comparison
        .metadata_diffs
        .iter()
        .any(|d| d.field == "seed"));
    assert!(comparison.difference_count() > 0);
}
