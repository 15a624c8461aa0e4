//! # af_sweep
//!
//! Multi-run orchestration: seed sweeps and variant matrices over a base
//! scenario, with aggregate statistics, tail-risk selection, pairwise
//! variant comparison, and report emission.
//!
//! Inter-run independence is total: every run gets a fresh pack (via the
//! scenario's factory), its own PRNG, and its own artifact directory.

pub mod matrix;
pub mod seedset;
pub mod stats;
pub mod sweep;

pub use matrix::{
    load_variant_entries, run_matrix, MatrixOptions, MatrixResult, PairwiseComparison,
    ScenarioOverrides, VariantEntry, VariantOutcome, VariantSpec,
};
pub use seedset::parse_seed_set;
pub use stats::{metric_stats, MetricStats};
pub use sweep::{run_sweep, SweepOptions, SweepResult};
