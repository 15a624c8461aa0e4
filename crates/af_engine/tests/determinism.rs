//! End-to-end engine properties: artifact byte-stability, counter
//! invariants, sampling cadence, scheduler-driven ordering, and boundary
//! behavior.

use std::env::temp_dir;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use af_artifacts::fingerprint_run;
use af_engine::{
    run, CheckpointConfig, PriorityFn, ProbeSpec, RunOptions, ScenarioBuilder, ScheduleStrategy,
};
use af_testkit::{eager_constructor, CounterPackFactory, TestScenario};
use af_types::{ParamValue, Params};

fn out_dir(tag: &str) -> PathBuf {
    temp_dir().join(format!("af_engine_it_{}_{}", std::process::id(), tag))
}

fn ci_options(tag: &str) -> RunOptions {
    RunOptions {
        out_dir: out_dir(tag),
        ci: true,
        ..RunOptions::default()
    }
}

#[test]
fn repeated_runs_are_byte_identical() {
    let options = ci_options("repeat");

    let first = run(
        &TestScenario::new(12345).ticks(10).eager_agents(3).build(),
        &options,
    )
    .unwrap();
    let fp_first = fingerprint_run(PathBuf::from(&first.output_dir).as_path()).unwrap();

    // Same scenario shape, fresh pack, same seed, same run directory.
    let second = run(
        &TestScenario::new(12345).ticks(10).eager_agents(3).build(),
        &options,
    )
    .unwrap();
    let fp_second = fingerprint_run(PathBuf::from(&second.output_dir).as_path()).unwrap();

    assert_eq!(fp_first, fp_second);
    assert!(fp_first.is_equivalent(&fp_second));
}

#[test]
fn different_seeds_produce_different_action_order() {
    let scenario_a = TestScenario::new(1).ticks(20).eager_agents(3).build();
    let log_a = scenario_a.execution_log();
    let _ = run(&scenario_a, &ci_options("seed_a")).unwrap();

    let scenario_b = TestScenario::new(2).ticks(20).eager_agents(3).build();
    let log_b = scenario_b.execution_log();
    let _ = run(&scenario_b, &ci_options("seed_b")).unwrap();

    let order_a = log_a.lock().unwrap().clone();
    let order_b = log_b.lock().unwrap().clone();
    assert_eq!(order_a.len(), order_b.len());
    assert_ne!(order_a, order_b, "distinct seeds should reorder agents");
}

#[test]
fn attempted_equals_succeeded_plus_failed() {
    let scenario = TestScenario::new(7)
        .ticks(12)
        .eager_agents(2)
        .skipping_agents(2)
        .erroring_agents(1)
        .build();
    let result = run(&scenario, &ci_options("invariant")).unwrap();

    for stats in &result.agent_stats {
        assert_eq!(
            stats.attempted,
            stats.succeeded + stats.failed,
            "agent {}",
            stats.agent_id
        );
    }

    let skipper = result
        .agent_stats
        .iter()
        .find(|s| s.agent_type == "skipper")
        .unwrap();
    assert_eq!(skipper.attempted, 0);
}

#[test]
fn always_throwing_agent_completes_the_run() {
    let ticks = 8;
    let scenario = TestScenario::new(3)
        .ticks(ticks)
        .eager_agents(0)
        .erroring_agents(1)
        .build();
    let result = run(&scenario, &ci_options("throwing")).unwrap();

    let agent = &result.agent_stats[0];
    assert_eq!(agent.attempted, ticks);
    assert_eq!(agent.failed, ticks);
    assert_eq!(agent.succeeded, 0);
    assert!(result.success);
}

#[test]
fn metrics_rows_follow_cadence_plus_forced_final() {
    // sample_every = 4, ticks = 10: periodic rows at 0, 4, 8, forced at 9.
    let scenario = TestScenario::new(5).ticks(10).sample_every(4).build();
    let result = run(&scenario, &ci_options("cadence")).unwrap();

    let csv = fs::read_to_string(PathBuf::from(&result.output_dir).join("metrics.csv")).unwrap();
    let ticks: Vec<u64> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(ticks, vec![0, 4, 8, 9]);

    // sample_every = 1: the forced final sample must not duplicate tick 9.
    let scenario = TestScenario::new(5).ticks(10).sample_every(1).build();
    let result = run(&scenario, &ci_options("cadence_dense")).unwrap();
    let csv = fs::read_to_string(PathBuf::from(&result.output_dir).join("metrics.csv")).unwrap();
    let ticks: Vec<u64> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(ticks, (0..10).collect::<Vec<u64>>());
}

#[test]
fn zero_tick_override_still_writes_artifacts() {
    let scenario = TestScenario::new(11).eager_agents(2).build();
    let options = RunOptions {
        ticks: Some(0),
        ..ci_options("zero_ticks")
    };
    let result = run(&scenario, &options).unwrap();

    assert_eq!(result.ticks, 0);
    assert!(result.success);
    assert!(result.final_metrics.is_empty());
    for stats in &result.agent_stats {
        assert_eq!(stats.attempted, 0);
    }

    let dir = PathBuf::from(&result.output_dir);
    assert!(dir.join("summary.json").exists());
    assert!(dir.join("config_resolved.json").exists());
    assert_eq!(
        fs::read_to_string(dir.join("metrics.csv")).unwrap().lines().count(),
        1,
        "header only"
    );
    assert_eq!(fs::read_to_string(dir.join("actions.ndjson")).unwrap(), "");
}

#[test]
fn rotate_schedule_shows_in_execution_order() {
    let scenario = TestScenario::new(9)
        .ticks(3)
        .eager_agents(3)
        .schedule(ScheduleStrategy::Rotate)
        .build();
    let log = scenario.execution_log();
    let _ = run(&scenario, &ci_options("rotate")).unwrap();

    let order = log.lock().unwrap().clone();
    let ids: Vec<&str> = order.iter().map(|(_, id)| id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "eager-0", "eager-1", "eager-2", // tick 0
            "eager-1", "eager-2", "eager-0", // tick 1
            "eager-2", "eager-0", "eager-1", // tick 2
        ]
    );
}

#[test]
fn priority_schedule_orders_by_rank() {
    // Ranks a:10, b:50, c:30, d:20, e:40 → b, e, c, d, a every tick.
    let factory = Arc::new(CounterPackFactory::new());
    let log = factory.log();

    let priority: PriorityFn = Arc::new(|core| core.param_f64("rank", 0.0));
    let mut builder = ScenarioBuilder::new("priority-order")
        .seed(1)
        .ticks(2)
        .tick_seconds(60.0)
        .pack(factory)
        .schedule(ScheduleStrategy::Priority(Some(priority)));

    for (tag, rank) in [("a", 10), ("b", 50), ("c", 30), ("d", 20), ("e", 40)] {
        let mut params = Params::new();
        let _ = params.insert("rank".into(), ParamValue::Int(rank));
        builder = builder.agents(tag, 1, params, eager_constructor());
    }

    let scenario = builder.build().unwrap();
    let _ = run(&scenario, &ci_options("priority")).unwrap();

    let order = log.lock().unwrap().clone();
    let tick0: Vec<&str> = order
        .iter()
        .filter(|(t, _)| *t == 0)
        .map(|(_, id)| id.as_str())
        .collect();
    assert_eq!(tick0, vec!["b-1", "e-4", "c-2", "d-3", "a-0"]);

    let tick1: Vec<&str> = order
        .iter()
        .filter(|(t, _)| *t == 1)
        .map(|(_, id)| id.as_str())
        .collect();
    assert_eq!(tick1, vec!["b-1", "e-4", "c-2", "d-3", "a-0"]);
}

#[test]
fn action_ids_are_deterministic_and_bounded() {
    let scenario = TestScenario::new(12345).ticks(10).eager_agents(2).build();
    let result = run(&scenario, &ci_options("action_ids")).unwrap();

    let body =
        fs::read_to_string(PathBuf::from(&result.output_dir).join("actions.ndjson")).unwrap();
    for line in body.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        let id = record["action"]["id"].as_str().unwrap();
        let agent_id = record["agentId"].as_str().unwrap();

        // <agent_id>-<name>-<tick>-<k>
        assert!(id.starts_with(&format!("{}-ping-", agent_id)));
        let k: u64 = id.rsplit('-').next().unwrap().parse().unwrap();
        assert!(k <= 1000);
    }
}

#[test]
fn failing_assertion_reports_actual_value() {
    // executed ends at 5; asserting eq 0 must fail with actualValue = 5.
    let scenario = TestScenario::new(2)
        .ticks(5)
        .eager_agents(1)
        .assert_eq("executed", 0.0)
        .build();
    let result = run(&scenario, &ci_options("assert_actual")).unwrap();

    assert!(!result.success);
    assert_eq!(result.failed_assertions.len(), 1);
    assert_eq!(
        result.failed_assertions[0].actual_value,
        Some(af_types::MetricValue::Number(5.0))
    );
}

#[test]
fn missing_metric_assertion_message() {
    let scenario = TestScenario::new(2)
        .ticks(2)
        .assert_gt("nonexistent", 0.0)
        .build();
    let result = run(&scenario, &ci_options("assert_missing")).unwrap();

    assert!(!result.success);
    assert_eq!(
        result.failed_assertions[0].message,
        "metric \"nonexistent\" not found"
    );
}

#[test]
fn checkpoints_written_on_cadence_never_tick_zero() {
    let scenario = TestScenario::new(4)
        .ticks(5)
        .checkpoints(CheckpointConfig {
            every_ticks: 2,
            include_agent_memory: true,
            include_probes: false,
        })
        .build();
    let result = run(&scenario, &ci_options("checkpoints")).unwrap();

    let dir = PathBuf::from(&result.output_dir).join("checkpoints");
    assert!(!dir.join("tick_00000.json").exists());
    assert!(dir.join("tick_00002.json").exists());
    assert!(dir.join("tick_00004.json").exists());

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("tick_00002.json")).unwrap()).unwrap();
    assert_eq!(doc["tick"], 2);
    assert!(doc["agentStates"].is_object());
    assert!(doc["createdAt"].is_string());
}

#[test]
fn probe_values_land_in_checkpoints() {
    let factory = Arc::new(CounterPackFactory::new());
    let scenario = ScenarioBuilder::new("probed")
        .seed(6)
        .ticks(6)
        .tick_seconds(60.0)
        .pack(factory)
        .agents("eager", 2, Params::new(), eager_constructor())
        .probe(ProbeSpec::call("executed", "counter", "executed"))
        .probe(ProbeSpec::call("missing", "counter", "nope"))
        .probe_every_ticks(2)
        .checkpoints(CheckpointConfig {
            every_ticks: 3,
            include_agent_memory: false,
            include_probes: true,
        })
        .build()
        .unwrap();

    let result = run(&scenario, &ci_options("probes")).unwrap();

    let path = PathBuf::from(&result.output_dir)
        .join("checkpoints")
        .join("tick_00003.json");
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    // Probes sampled at tick 2 (cadence 2); two agents acted on each of
    // ticks 0..=2 by then.
    assert_eq!(doc["probeValues"]["executed"], 6.0);
    assert_eq!(doc["probeValues"]["missing"], serde_json::Value::Null);
    assert!(doc["agentStates"].is_null());
}

#[test]
fn pack_init_failure_is_fatal() {
    let scenario = ScenarioBuilder::new("init-fails")
        .seed(1)
        .ticks(3)
        .tick_seconds(60.0)
        .pack(Arc::new(af_testkit::FailingInitPackFactory))
        .agents("eager", 1, Params::new(), eager_constructor())
        .build()
        .unwrap();

    let err = run(&scenario, &ci_options("pack_init")).unwrap_err();
    assert_eq!(err.kind_code(), "pack_init");
}

#[test]
fn summary_round_trips_final_metrics() {
    let scenario = TestScenario::new(21).ticks(6).eager_agents(2).build();
    let result = run(&scenario, &ci_options("round_trip")).unwrap();

    let body =
        fs::read_to_string(PathBuf::from(&result.output_dir).join("summary.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        doc["finalMetrics"],
        serde_json::to_value(&result.final_metrics).unwrap()
    );
    assert_eq!(doc["runId"], "testkit-ci");
}

#[test]
fn canonical_initial_timestamp_formula() {
    let scenario = TestScenario::new(12345).ticks(1).build();
    let result = run(&scenario, &ci_options("timestamp")).unwrap();

    let csv = fs::read_to_string(PathBuf::from(&result.output_dir).join("metrics.csv")).unwrap();
    let first_row = csv.lines().nth(1).unwrap();
    let timestamp = first_row.split(',').nth(1).unwrap();
    // 1_700_000_000 + (12345 % 1_000_000)
    assert_eq!(timestamp, "1700012345");
}
