//! # af_artifacts (layer 2)
//!
//! The canonical on-disk output of a run and the tooling that certifies it:
//! run directory layout, artifact files, checkpoint files, determinism
//! fingerprints, and the tracing bootstrap.
//!
//! ## Byte-stability contract
//! Every artifact's canonical bytes are a pure function of
//! `(scenario, seed, ticks, tick_seconds)` once the wall-clock fields
//! (`summary.timestamp`, `summary.durationMs`, per-action `durationMs` and
//! `timestamp`, `options.outDir`) are projected out. JSON objects emit in
//! struct declaration order or `BTreeMap` key order; nothing iterates an
//! unordered container.

pub mod checkpoint;
pub mod clock;
pub mod csv;
pub mod fingerprint;
pub mod json;
pub mod observability;
pub mod writer;

pub use checkpoint::CheckpointWriter;
pub use clock::wall_clock_iso;
pub use fingerprint::{fingerprint_run, RunFingerprint};
pub use writer::{run_id_for, ArtifactWriter};
