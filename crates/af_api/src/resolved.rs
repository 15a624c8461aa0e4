//! # Resolved configuration
//!
//! The effective scenario and engine options as they were in force for a
//! run, written as `config_resolved.json`. This is the shape comparison
//! tooling diffs; `options.outDir` is dropped before fingerprinting.

use serde::{Deserialize, Serialize};

use af_types::Params;

use crate::assertion::AssertionSpec;

/// One agent configuration as resolved for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentShape {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub count: u32,
    #[serde(default)]
    pub params: Params,
}

/// Metrics collection settings as resolved for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsShape {
    pub sample_every_ticks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<Vec<String>>,
}

/// Checkpoint settings as resolved for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointShape {
    pub every_ticks: u64,
    pub include_agent_memory: bool,
    pub include_probes: bool,
}

/// Declarative description of one probe (computed probes show kind only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeShape {
    pub name: String,
    pub kind: String,
}

/// The effective scenario for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioShape {
    pub name: String,
    pub seed: u64,
    pub ticks: u64,
    pub tick_seconds: f64,
    /// Pack label, not pack state
    pub pack: String,
    pub agents: Vec<AgentShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<AssertionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<CheckpointShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_every_ticks: Option<u64>,
}

/// Engine options in force for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsShape {
    pub out_dir: String,
    pub ci: bool,
    pub verbose: bool,
}

/// Top-level document for `config_resolved.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub scenario: ScenarioShape,
    pub options: OptionsShape,
}
