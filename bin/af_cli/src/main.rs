//! # af_cli
//!
//! Command-line surface over the simulation kernel.
//!
//! ## Commands
//! - `run`: execute one scenario
//! - `sweep`: one scenario across a seed set
//! - `matrix`: variants x seeds with pairwise comparison
//! - `compare`: diff two finished runs
//! - `report`: regenerate a run's markdown report
//!
//! ## Exit classes
//! `0` success, `1` assertion/variant failure, `2` infrastructure error.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use af_artifacts::observability::init_tracing;
use af_engine::{run, RunOptions, Scenario};
use af_loader::{load_scenario, Registry};
use af_report::compare::{compare_runs, comparison_markdown};
use af_report::generate_run_report;
use af_sweep::{
    load_variant_entries, parse_seed_set, run_matrix, run_sweep, MatrixOptions, SweepOptions,
    VariantSpec,
};
use af_types::{ForgeError, ForgeResult, Params};

/// AgentForge - deterministic agent-based simulation runner
#[derive(Parser)]
#[command(name = "agentforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one scenario run
    Run {
        /// Scenario document (JSON); optional with --toy
        scenario_path: Option<PathBuf>,

        /// Use the built-in toy-market scenario
        #[arg(long)]
        toy: bool,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Tick budget override
        #[arg(long)]
        ticks: Option<u64>,

        /// Simulated seconds per tick override
        #[arg(long)]
        tick_seconds: Option<f64>,

        /// Output directory for run artifacts
        #[arg(long, default_value = "./runs", alias = "output-path")]
        out: PathBuf,

        /// Stable run id for artifact diffing (also CI=true)
        #[arg(long)]
        ci: bool,

        /// Print a condensed summary instead of the default lines
        #[arg(long)]
        summary: bool,

        /// Print the full run result as JSON
        #[arg(long)]
        json: bool,

        /// Write run.log and verbose tracing
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run one scenario across a seed set
    Sweep {
        /// Scenario document (JSON); optional with --toy
        scenario_path: Option<PathBuf>,

        /// Use the built-in toy-market scenario
        #[arg(long)]
        toy: bool,

        /// Seed set: a..b, comma list, or a bare count
        #[arg(long, default_value = "5")]
        seeds: String,

        /// Tick budget override
        #[arg(long)]
        ticks: Option<u64>,

        /// Output directory
        #[arg(long, default_value = "./runs")]
        out: PathBuf,

        /// Stable run ids
        #[arg(long)]
        ci: bool,

        /// Print the aggregate result as JSON
        #[arg(long)]
        json: bool,

        /// Fan-out hint (runs stay sequential and deterministic)
        #[arg(long)]
        parallel: Option<u32>,
    },

    /// Run variants x seeds with pairwise comparison
    Matrix {
        /// Base scenario document (JSON)
        scenario_path: PathBuf,

        /// Variants file (JSON array)
        #[arg(long)]
        variants: PathBuf,

        /// Seed set: a..b, comma list, or a bare count
        #[arg(long, default_value = "2")]
        seeds: String,

        /// Tick budget override
        #[arg(long)]
        ticks: Option<u64>,

        /// Output directory
        #[arg(long, default_value = "./runs")]
        out: PathBuf,

        /// Stable run ids
        #[arg(long)]
        ci: bool,

        /// Print the per-variant outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diff two finished run directories
    Compare {
        run_dir_a: PathBuf,
        run_dir_b: PathBuf,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,

        /// Percent-change threshold for flagging KPI diffs
        #[arg(long, default_value = "5.0")]
        threshold: f64,

        /// Write the markdown comparison to a file
        #[arg(short)]
        output: Option<PathBuf>,
    },

    /// Regenerate the markdown report for a run directory
    Report {
        run_dir: PathBuf,

        /// Write the markdown report to a file
        #[arg(short)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let outcome = match cli.command {
        Commands::Run {
            scenario_path,
            toy,
            seed,
            ticks,
            tick_seconds,
            out,
            ci,
            summary,
            json,
            verbose,
        } => cmd_run(
            scenario_path,
            toy,
            RunOptions {
                seed,
                ticks,
                tick_seconds,
                out_dir: out,
                ci,
                verbose,
            },
            summary,
            json,
        ),
        Commands::Sweep {
            scenario_path,
            toy,
            seeds,
            ticks,
            out,
            ci,
            json,
            parallel,
        } => cmd_sweep(scenario_path, toy, &seeds, ticks, out, ci, json, parallel),
        Commands::Matrix {
            scenario_path,
            variants,
            seeds,
            ticks,
            out,
            ci,
            json,
        } => cmd_matrix(&scenario_path, &variants, &seeds, ticks, out, ci, json),
        Commands::Compare {
            run_dir_a,
            run_dir_b,
            json,
            threshold,
            output,
        } => cmd_compare(&run_dir_a, &run_dir_b, json, threshold, output),
        Commands::Report { run_dir, output } => cmd_report(&run_dir, output),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!(kind = e.kind_code(), "{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Resolve the scenario source: `--toy` or a document path.
fn resolve_scenario(
    scenario_path: Option<&PathBuf>,
    toy: bool,
    seed: Option<u64>,
    ticks: Option<u64>,
) -> ForgeResult<Scenario> {
    if toy {
        return af_packs::toy_scenario(seed.unwrap_or(1337), ticks.unwrap_or(100));
    }
    match scenario_path {
        Some(path) => load_scenario(path, &Registry::builtin()),
        None => Err(ForgeError::InvalidScenario(
            "provide a scenario path or --toy".into(),
        )),
    }
}

fn cmd_run(
    scenario_path: Option<PathBuf>,
    toy: bool,
    options: RunOptions,
    summary: bool,
    json: bool,
) -> ForgeResult<ExitCode> {
    let scenario = resolve_scenario(scenario_path.as_ref(), toy, options.seed, options.ticks)?;
    let result = run(&scenario, &options)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result)
                .map_err(|e| ForgeError::Internal(format!("result serialization: {}", e)))?
        );
    } else if summary {
        println!(
            "{} seed={} ticks={} success={} failed_assertions={}",
            result.run_id,
            result.seed,
            result.ticks,
            result.success,
            result.failed_assertions.len()
        );
    } else {
        println!("Run: {}", result.run_id);
        println!("  success: {}", result.success);
        println!("  artifacts: {}", result.output_dir);
        for failure in &result.failed_assertions {
            println!("  FAILED: {}", failure.message);
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_sweep(
    scenario_path: Option<PathBuf>,
    toy: bool,
    seeds: &str,
    ticks: Option<u64>,
    out: PathBuf,
    ci: bool,
    json: bool,
    parallel: Option<u32>,
) -> ForgeResult<ExitCode> {
    let scenario = resolve_scenario(scenario_path.as_ref(), toy, None, ticks)?;
    let options = SweepOptions {
        seeds: parse_seed_set(seeds)?,
        ticks,
        out_dir: out,
        ci,
        parallel,
    };
    let result = run_sweep(&scenario, &options)?;

    if json {
        let doc = serde_json::json!({
            "scenario": scenario.name,
            "seeds": options.seeds,
            "passed": result.passed,
            "failed": result.failed,
            "worstSeeds": result.worst_seeds,
            "stats": result.stats,
            "sweepDir": result.sweep_dir.to_string_lossy(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc)
                .map_err(|e| ForgeError::Internal(format!("result serialization: {}", e)))?
        );
    } else {
        println!(
            "Sweep {}: {} passed, {} failed ({} seeds)",
            scenario.name,
            result.passed,
            result.failed,
            result.runs.len()
        );
        println!("  report: {}", result.sweep_dir.join("report.md").display());
    }

    Ok(if result.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn cmd_matrix(
    scenario_path: &PathBuf,
    variants_path: &PathBuf,
    seeds: &str,
    ticks: Option<u64>,
    out: PathBuf,
    ci: bool,
    json: bool,
) -> ForgeResult<ExitCode> {
    let registry = Registry::builtin();
    let scenario = load_scenario(scenario_path, &registry)?;

    let mut variants = Vec::new();
    for entry in load_variant_entries(variants_path)? {
        let mut variant = VariantSpec::new(&entry.name).overrides(entry.overrides.clone());
        if let Some(description) = &entry.description {
            variant = variant.description(description);
        }
        if let Some(pack_label) = &entry.pack {
            variant = variant.pack_override(registry.pack(pack_label, &Params::new())?);
        }
        variants.push(variant);
    }

    let options = MatrixOptions {
        seeds: parse_seed_set(seeds)?,
        ticks,
        out_dir: out,
        ci,
    };
    let result = run_matrix(&scenario, &variants, &options)?;

    if json {
        let doc = serde_json::json!({
            "scenario": scenario.name,
            "variants": result
                .variants
                .iter()
                .map(|v| serde_json::json!({
                    "name": v.name,
                    "passed": v.passed,
                    "failed": v.failed,
                    "averaged": v.averaged,
                }))
                .collect::<Vec<_>>(),
            "matrixDir": result.matrix_dir.to_string_lossy(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc)
                .map_err(|e| ForgeError::Internal(format!("result serialization: {}", e)))?
        );
    } else {
        for variant in &result.variants {
            println!(
                "Variant {}: {} passed, {} failed",
                variant.name, variant.passed, variant.failed
            );
        }
        println!("  report: {}", result.matrix_dir.join("report.md").display());
    }

    Ok(if result.any_variant_failed_entirely() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_compare(
    run_dir_a: &PathBuf,
    run_dir_b: &PathBuf,
    json: bool,
    threshold: f64,
    output: Option<PathBuf>,
) -> ForgeResult<ExitCode> {
    let comparison = compare_runs(run_dir_a, run_dir_b, threshold)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&comparison)
                .map_err(|e| ForgeError::Internal(format!("result serialization: {}", e)))?
        );
    } else {
        let markdown = comparison_markdown(&comparison);
        match output {
            Some(path) => fs::write(&path, markdown).map_err(|e| {
                ForgeError::ArtifactWrite(format!("failed to write {:?}: {}", path, e))
            })?,
            None => print!("{}", markdown),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_report(run_dir: &PathBuf, output: Option<PathBuf>) -> ForgeResult<ExitCode> {
    let markdown = generate_run_report(run_dir)?;
    match output {
        Some(path) => fs::write(&path, markdown)
            .map_err(|e| ForgeError::ArtifactWrite(format!("failed to write {:?}: {}", path, e)))?,
        None => print!("{}", markdown),
    }
    Ok(ExitCode::SUCCESS)
}
