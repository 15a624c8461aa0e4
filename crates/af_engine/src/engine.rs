//! # Engine
//!
//! Drives one run: resolve overrides, seed the PRNG, initialize the pack,
//! construct agents, execute the tick loop, sample metrics and probes,
//! write checkpoints, validate assertions, and emit the artifact set.
//!
//! ## Determinism contract
//! - Canonical initial timestamp: `1_700_000_000 + (seed % 1_000_000)`;
//!   tick `t` runs at `initial + t * tick_seconds`
//! - Tick RNG: `top.derive(tick)`; agent RNG: `tick_rng.derive(tick, id)`
//! - Wall clock appears only in `run_id` (non-CI), `summary.timestamp`,
//!   checkpoint `created_at`, and duration fields — all projected out of
//!   the fingerprint
//!
//! ## Failure model
//! Agent and action failures are recovered at the step boundary and the run
//! continues; pack-init and artifact I/O failures are fatal (exit class 2).

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use af_api::assertion::evaluate_all;
use af_api::record::{ActionRecord, ActionSummary, CheckpointDoc, ResultSummary, WorldSummary};
use af_api::resolved::{OptionsShape, ResolvedConfig};
use af_api::RunResult;
use af_artifacts::{run_id_for, wall_clock_iso, ArtifactWriter, CheckpointWriter};
use af_types::{ForgeError, ForgeResult, Seed, Tick};

use crate::agent::Agent;
use crate::metrics::MetricsCollector;
use crate::pack::Pack;
use crate::probes::{ProbeSampler, ProbeValues};
use crate::rng::ForgeRng;
use crate::scenario::Scenario;
use crate::scheduler::Scheduler;

/// Offset anchoring simulated time; part of the determinism contract.
const TIMESTAMP_BASE: u64 = 1_700_000_000;
/// Modulus applied to the seed when anchoring simulated time.
const TIMESTAMP_SEED_MOD: u64 = 1_000_000;

/// Per-run overrides resolved over the scenario's declared values.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub ticks: Option<u64>,
    pub tick_seconds: Option<f64>,
    pub out_dir: PathBuf,
    pub ci: bool,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            seed: None,
            ticks: None,
            tick_seconds: None,
            out_dir: PathBuf::from("./runs"),
            ci: false,
            verbose: false,
        }
    }
}

impl RunOptions {
    /// `CI=true` in the environment enables CI mode equivalently to the flag.
    pub fn ci_resolved(&self) -> bool {
        self.ci || std::env::var("CI").map(|v| v == "true").unwrap_or(false)
    }
}

/// The canonical tick-0 timestamp for a seed.
pub fn initial_timestamp(seed: Seed) -> f64 {
    (TIMESTAMP_BASE + seed.as_u64() % TIMESTAMP_SEED_MOD) as f64
}

/// Execute one run of `scenario` with `options` resolved over its defaults.
///
/// Returns a [`RunResult`] even when assertions fail; only infrastructure
/// errors (pack init, artifact I/O) propagate.
pub fn run(scenario: &Scenario, options: &RunOptions) -> ForgeResult<RunResult> {
    let started = Instant::now();

    let seed = options.seed.map(Seed::new).unwrap_or(scenario.seed);
    let ticks = options.ticks.unwrap_or(scenario.ticks);
    let tick_seconds = options.tick_seconds.unwrap_or(scenario.tick_seconds);
    let ci = options.ci_resolved();
    let run_id = run_id_for(&scenario.name, ci);

    info!(
        scenario = %scenario.name,
        %seed,
        ticks,
        run_id = %run_id,
        "starting run"
    );

    let top = ForgeRng::new(seed);
    let mut collector = MetricsCollector::new(
        scenario.metrics.sample_every_ticks,
        scenario.metrics.allow_list.clone(),
    );
    let writer = ArtifactWriter::create(&options.out_dir, &run_id)?;
    let checkpoint_writer = match &scenario.checkpoints {
        Some(cfg) => Some(CheckpointWriter::create(
            writer.run_dir(),
            cfg.every_ticks,
            cfg.include_agent_memory,
            cfg.include_probes,
        )?),
        None => None,
    };
    let probe_sampler = if scenario.probes.is_empty() {
        None
    } else {
        Some(ProbeSampler::new(scenario.probes.clone()))
    };

    let mut pack = scenario.pack.build();
    pack.initialize().map_err(|e| match e {
        ForgeError::PackInit(_) => e,
        other => ForgeError::PackInit(other.to_string()),
    })?;

    // Agents in declaration order, ids numbered by a global counter.
    let mut agents: Vec<Box<dyn Agent>> = Vec::new();
    for spec in &scenario.agents {
        for _ in 0..spec.count {
            let id = format!("{}-{}", spec.type_tag, agents.len());
            agents.push((spec.constructor)(&id, spec.params.clone()));
        }
    }

    let t0 = initial_timestamp(seed);
    let mut run_log: Vec<String> = Vec::new();
    run_log.push(format!(
        "run {} seed={} ticks={} agents={}",
        run_id,
        seed.as_u64(),
        ticks,
        agents.len()
    ));

    // Tick-0 initialization, in construction order.
    for idx in 0..agents.len() {
        let agent_id = agents[idx].core().id().to_string();
        pack.set_current_agent(&agent_id);
        let mut ctx = crate::context::TickContext {
            tick: Tick::ZERO,
            timestamp: t0,
            rng: top.derive(Tick::ZERO, Some(&agent_id)),
            world: pack.world_state(),
            pack: &*pack,
        };
        if let Err(e) = agents[idx].initialize(&mut ctx) {
            warn!(agent = %agent_id, kind = e.kind_code(), "agent initialize failed: {}", e);
        }
    }

    let mut scheduler = Scheduler::new(scenario.schedule.clone());
    scheduler.reset();

    let mut action_log: Vec<ActionRecord> = Vec::new();
    let mut last_probe_values: Option<ProbeValues> = None;

    for t in 0..ticks {
        let tick = Tick(t);
        let timestamp = t0 + t as f64 * tick_seconds;

        pack.on_tick(tick, timestamp);

        let mut tick_rng = top.derive(tick, None);
        let order = scheduler.order(&agents, tick, &mut tick_rng);

        let mut executed = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;

        for idx in order {
            let agent_id = agents[idx].core().id().to_string();
            let agent_type = agents[idx].core().type_tag().to_string();
            let agent_rng = tick_rng.derive(tick, Some(&agent_id));

            pack.set_current_agent(&agent_id);
            let step_started = Instant::now();
            let decision = {
                let mut ctx = crate::context::TickContext {
                    tick,
                    timestamp,
                    rng: agent_rng,
                    world: pack.world_state(),
                    pack: &*pack,
                };
                agents[idx].step(&mut ctx)
            };
            agents[idx].core_mut().mark_executed(tick);

            let (action, result) = match decision {
                Ok(Some(action)) => {
                    let result = pack.execute_action(&action, &agent_id);
                    if result.ok {
                        agents[idx].core_mut().record_success();
                        executed += 1;
                    } else {
                        agents[idx].core_mut().record_failure();
                        failed += 1;
                        debug!(
                            agent = %agent_id,
                            action = %action.name,
                            "action rejected: {}",
                            result.error.as_deref().unwrap_or("unknown")
                        );
                    }
                    (
                        Some(ActionSummary::from(&action)),
                        Some(ResultSummary::from(&result)),
                    )
                }
                Ok(None) => {
                    agents[idx].core_mut().record_skip();
                    skipped += 1;
                    (None, None)
                }
                Err(e) => {
                    agents[idx].core_mut().record_failure();
                    failed += 1;
                    warn!(agent = %agent_id, kind = e.kind_code(), "agent step failed: {}", e);
                    (
                        None,
                        Some(ResultSummary {
                            ok: false,
                            error: Some(e.to_string()),
                            gas_used: None,
                            tx_hash: None,
                        }),
                    )
                }
            };

            action_log.push(ActionRecord {
                tick,
                timestamp,
                agent_id,
                agent_type,
                action,
                result,
                duration_ms: step_started.elapsed().as_millis() as u64,
            });
        }

        collector.sample(tick, timestamp, &*pack);

        if let Some(sampler) = &probe_sampler {
            if t % scenario.probe_every_ticks == 0 {
                last_probe_values = Some(sampler.sample(&*pack));
            }
        }

        if let Some(cw) = &checkpoint_writer {
            if cw.should_checkpoint(tick) {
                let doc = CheckpointDoc {
                    tick,
                    timestamp,
                    created_at: wall_clock_iso(),
                    world_summary: WorldSummary {
                        timestamp,
                        metrics: pack.metrics(),
                    },
                    agent_states: cw.include_agent_memory().then(|| {
                        agents
                            .iter()
                            .map(|a| (a.core().id().to_string(), a.core().state_snapshot(tick)))
                            .collect()
                    }),
                    probe_values: if cw.include_probes() {
                        last_probe_values.clone()
                    } else {
                        None
                    },
                };
                let _ = cw.write(&doc)?;
            }
        }

        run_log.push(format!(
            "tick={} executed={} skipped={} failed={}",
            t, executed, skipped, failed
        ));
    }

    // Forced final sample; with ticks = 0 there is no last tick to sample.
    if ticks > 0 {
        let last = ticks - 1;
        collector.force_sample(Tick(last), t0 + last as f64 * tick_seconds, &*pack);
    }

    for agent in &mut agents {
        agent.cleanup();
    }

    let final_metrics = collector.final_metrics();
    let failed_assertions = evaluate_all(&scenario.assertions, &final_metrics);
    let success = failed_assertions.is_empty();

    let result = RunResult {
        run_id: run_id.clone(),
        scenario_name: scenario.name.clone(),
        seed: seed.as_u64(),
        ticks,
        duration_ms: started.elapsed().as_millis() as u64,
        success,
        failed_assertions,
        final_metrics,
        agent_stats: agents.iter().map(|a| a.core().stats_entry()).collect(),
        output_dir: writer.run_dir().to_string_lossy().to_string(),
    };

    writer.write_metrics_csv(&collector.to_csv())?;
    writer.write_actions(&action_log)?;
    writer.write_config(&ResolvedConfig {
        scenario: scenario.shape(seed, ticks, tick_seconds),
        options: OptionsShape {
            out_dir: options.out_dir.to_string_lossy().to_string(),
            ci,
            verbose: options.verbose,
        },
    })?;
    writer.write_summary(&result, wall_clock_iso())?;
    if options.verbose {
        run_log.push(format!(
            "done success={} failed_assertions={}",
            result.success,
            result.failed_assertions.len()
        ));
        writer.write_run_log(&run_log)?;
    }

    pack.cleanup();

    info!(
        run_id = %run_id,
        success = result.success,
        duration_ms = result.duration_ms,
        "run complete"
    );

    Ok(result)
}
