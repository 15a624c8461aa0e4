//! # af_api (layer 1)
//!
//! The stable internal language of the framework: actions, action results,
//! run records, assertions, and the resolved-configuration shape that lands
//! on disk. Everything here is serializable and free of behavior.

pub mod action;
pub mod assertion;
pub mod record;
pub mod resolved;

pub use action::{Action, ActionEvent, ActionResult};
pub use assertion::{AssertionOp, AssertionSpec};
pub use record::{
    ActionRecord, ActionSummary, AgentStats, AgentStatsEntry, CheckpointDoc, FailedAssertion,
    MetricsSample, ResultSummary, RunResult, WorldSummary,
};

use std::collections::BTreeMap;

use af_types::MetricValue;

/// Read-only world snapshot delivered to agents each tick.
///
/// An open map: packs populate `timestamp` plus whatever protocol keys they
/// define; the engine never interprets the keys. `BTreeMap` keeps iteration
/// deterministic on every emission path.
pub type WorldState = BTreeMap<String, MetricValue>;

/// Conventional key packs use for the current simulated time.
pub const WORLD_TIMESTAMP_KEY: &str = "timestamp";
