//! # Records
//!
//! Facts produced while a run executes: action-log records, metric samples,
//! agent statistics, checkpoint payloads, and the final run result.
//!
//! All of these land on disk in camelCase; field declaration order is the
//! canonical key order of the emitted JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use af_types::{MetricMap, MetricValue, Params, Tick};

use crate::action::Action;
use crate::assertion::AssertionOp;

// ============================================================================
// Action log
// ============================================================================

/// Projection of an [`Action`] for the action log (metadata is dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub id: String,
    pub name: String,
    pub params: Params,
}

impl From<&Action> for ActionSummary {
    fn from(action: &Action) -> Self {
        ActionSummary {
            id: action.id.clone(),
            name: action.name.clone(),
            params: action.params.clone(),
        }
    }
}

/// Projection of an action result for the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Serialized as a base-10 string
    #[serde(
        default,
        with = "gas_string",
        skip_serializing_if = "Option::is_none",
        rename = "gasUsed"
    )]
    pub gas_used: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<&crate::action::ActionResult> for ResultSummary {
    fn from(result: &crate::action::ActionResult) -> Self {
        ResultSummary {
            ok: result.ok,
            error: result.error.clone(),
            gas_used: result.gas_used,
            tx_hash: result.tx_hash.clone(),
        }
    }
}

/// One line of `actions.ndjson`, appended in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub tick: Tick,
    pub timestamp: f64,
    pub agent_id: String,
    pub agent_type: String,
    /// `None` when the agent skipped the tick
    pub action: Option<ActionSummary>,
    /// `None` when no action was executed
    pub result: Option<ResultSummary>,
    /// Wall-clock duration; projected out of the determinism fingerprint
    pub duration_ms: u64,
}

mod gas_string {
    use serde::de::{self, Deserializer};
    use serde::ser::Serializer;
    use serde::Deserialize;

    pub fn serialize<S: Serializer>(v: &Option<u128>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(gas) => s.serialize_str(&gas.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u128>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(s) => s
                .parse::<u128>()
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid gas value: {}", e))),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// One captured metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub tick: Tick,
    pub timestamp: f64,
    pub metrics: MetricMap,
}

// ============================================================================
// Agent statistics
// ============================================================================

/// Per-agent action counters. Invariant: `attempted = succeeded + failed`
/// at all times; a skipped tick increments none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl AgentStats {
    #[inline]
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    #[inline]
    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// A skipped tick touches no counter.
    #[inline]
    pub fn record_skip(&mut self) {}
}

/// Stats entry as it appears in `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatsEntry {
    pub agent_id: String,
    pub agent_type: String,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

// ============================================================================
// Checkpoints
// ============================================================================

/// Condensed world view stored in a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub timestamp: f64,
    pub metrics: MetricMap,
}

/// Per-agent state snapshot, included when the scenario asks for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateSnapshot {
    pub memory: Params,
    /// action name → tick at which it becomes available again
    pub active_cooldowns: BTreeMap<String, u64>,
}

/// The document written as `checkpoints/tick_NNNNN.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointDoc {
    pub tick: Tick,
    pub timestamp: f64,
    /// Wall clock; excluded from the determinism fingerprint
    pub created_at: String,
    pub world_summary: WorldSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_states: Option<BTreeMap<String, AgentStateSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_values: Option<BTreeMap<String, Option<MetricValue>>>,
}

// ============================================================================
// Run result
// ============================================================================

/// One assertion that did not hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAssertion {
    pub op: AssertionOp,
    pub metric: String,
    pub expected: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<MetricValue>,
    pub message: String,
}

/// The outcome of one run, returned by the engine and persisted (with a
/// wall-clock stamp added) as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub scenario_name: String,
    pub seed: u64,
    pub ticks: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub failed_assertions: Vec<FailedAssertion>,
    pub final_metrics: MetricMap,
    pub agent_stats: Vec<AgentStatsEntry>,
    pub output_dir: String,
}

impl RunResult {
    /// Overall agent success rate: `total_succeeded / max(1, total_attempted)`.
    pub fn success_rate(&self) -> f64 {
        let attempted: u64 = self.agent_stats.iter().map(|s| s.attempted).sum();
        let succeeded: u64 = self.agent_stats.iter().map(|s| s.succeeded).sum();
        succeeded as f64 / attempted.max(1) as f64
    }
}
