//! # Scenario files
//!
//! JSON scenario documents. A document must satisfy the structural check
//! (`name`, `seed`, `ticks`, `tick_seconds`, `pack`, `agents`); anything
//! less is `InvalidScenario`. Unreadable files are `ScenarioLoad`.
//!
//! ```json
//! {
//!   "name": "toy-sweep",
//!   "seed": 1337,
//!   "ticks": 100,
//!   "tick_seconds": 3600,
//!   "pack": { "type": "toy_market", "config": { "volatility": 0.05 } },
//!   "agents": [ { "type": "trader", "count": 3, "params": { "trade_chance": 0.7 } } ],
//!   "assertions": [ { "op": "gt", "metric": "totalVolume", "value": 0 } ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use af_api::AssertionSpec;
use af_engine::{
    CheckpointConfig, MetricsConfig, ProbeSpec, Scenario, ScenarioBuilder, ScheduleStrategy,
};
use af_types::{ForgeError, ForgeResult, Params};

use crate::registry::Registry;

/// Pack reference: a bare label or a label with a config object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PackRef {
    Label(String),
    Configured {
        #[serde(rename = "type")]
        type_tag: String,
        #[serde(default)]
        config: Params,
    },
}

impl PackRef {
    fn parts(&self) -> (&str, Params) {
        match self {
            PackRef::Label(label) => (label, Params::new()),
            PackRef::Configured { type_tag, config } => (type_tag, config.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AgentEntry {
    #[serde(rename = "type")]
    type_tag: String,
    count: u32,
    #[serde(default)]
    params: Params,
}

#[derive(Debug, Clone, Deserialize)]
struct MetricsEntry {
    #[serde(default = "default_sample_every")]
    sample_every_ticks: u64,
    #[serde(default)]
    allow_list: Option<Vec<String>>,
}

fn default_sample_every() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct CheckpointEntry {
    every_ticks: u64,
    #[serde(default)]
    include_agent_memory: bool,
    #[serde(default)]
    include_probes: bool,
}

/// Declarative probes only; computed probes are code and register through
/// the builder API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ProbeEntry {
    Call {
        name: String,
        target: String,
        method: String,
    },
    Balance {
        name: String,
        addresses: Vec<String>,
        #[serde(default)]
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ScenarioFile {
    name: String,
    seed: u64,
    ticks: u64,
    tick_seconds: f64,
    pack: PackRef,
    agents: Vec<AgentEntry>,
    #[serde(default)]
    metrics: Option<MetricsEntry>,
    #[serde(default)]
    assertions: Vec<AssertionSpec>,
    #[serde(default)]
    checkpoints: Option<CheckpointEntry>,
    #[serde(default)]
    probes: Vec<ProbeEntry>,
    #[serde(default)]
    probe_every_ticks: Option<u64>,
    #[serde(default)]
    schedule: Option<String>,
}

/// Load a scenario document and resolve it against `registry`.
pub fn load_scenario(path: &Path, registry: &Registry) -> ForgeResult<Scenario> {
    let body = fs::read_to_string(path)
        .map_err(|e| ForgeError::ScenarioLoad(format!("failed to read {:?}: {}", path, e)))?;

    let file: ScenarioFile = serde_json::from_str(&body).map_err(|e| {
        ForgeError::InvalidScenario(format!("scenario {:?} failed structural check: {}", path, e))
    })?;

    info!(scenario = %file.name, path = ?path, "loaded scenario document");

    let (pack_label, pack_config) = file.pack.parts();
    let mut builder = ScenarioBuilder::new(&file.name)
        .seed(file.seed)
        .ticks(file.ticks)
        .tick_seconds(file.tick_seconds)
        .pack(registry.pack(pack_label, &pack_config)?);

    for agent in &file.agents {
        builder = builder.agents(
            &agent.type_tag,
            agent.count,
            agent.params.clone(),
            registry.agent(&agent.type_tag)?,
        );
    }

    if let Some(metrics) = file.metrics {
        builder = builder.metrics(MetricsConfig {
            sample_every_ticks: metrics.sample_every_ticks,
            allow_list: metrics.allow_list,
        });
    }

    for assertion in file.assertions {
        builder = builder.assertion(assertion);
    }

    if let Some(cp) = file.checkpoints {
        builder = builder.checkpoints(CheckpointConfig {
            every_ticks: cp.every_ticks,
            include_agent_memory: cp.include_agent_memory,
            include_probes: cp.include_probes,
        });
    }

    for probe in file.probes {
        builder = builder.probe(match probe {
            ProbeEntry::Call {
                name,
                target,
                method,
            } => ProbeSpec::call(name, target, method),
            ProbeEntry::Balance {
                name,
                addresses,
                token,
            } => ProbeSpec::balance(name, addresses, token),
        });
    }

    if let Some(every) = file.probe_every_ticks {
        builder = builder.probe_every_ticks(every);
    }

    if let Some(schedule) = file.schedule.as_deref() {
        builder = builder.schedule(match schedule {
            "shuffle" => ScheduleStrategy::Shuffle,
            "rotate" => ScheduleStrategy::Rotate,
            // A document cannot carry a priority function; identity order.
            "priority" => ScheduleStrategy::Priority(None),
            other => {
                return Err(ForgeError::InvalidScenario(format!(
                    "unknown schedule strategy \"{}\"",
                    other
                )))
            }
        });
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn write_doc(name: &str, body: &str) -> PathBuf {
        let path = temp_dir().join(format!("af_loader_{}_{}", std::process::id(), name));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_a_minimal_document() {
        let path = write_doc(
            "minimal.json",
            r#"{
                "name": "from-file",
                "seed": 7,
                "ticks": 20,
                "tick_seconds": 3600,
                "pack": "toy_market",
                "agents": [ { "type": "trader", "count": 2 } ]
            }"#,
        );
        let scenario = load_scenario(&path, &Registry::builtin()).unwrap();
        assert_eq!(scenario.name, "from-file");
        assert_eq!(scenario.seed.as_u64(), 7);
        assert_eq!(scenario.agents.len(), 1);
        assert_eq!(scenario.agents[0].count, 2);
    }

    #[test]
    fn loads_configured_pack_and_probes() {
        let path = write_doc(
            "full.json",
            r#"{
                "name": "full",
                "seed": 1,
                "ticks": 10,
                "tick_seconds": 60,
                "pack": { "type": "toy_market", "config": { "volatility": 0.1 } },
                "agents": [ { "type": "maker", "count": 1, "params": { "rank": 3 } } ],
                "assertions": [ { "op": "gte", "metric": "tradeCount", "value": 0 } ],
                "probes": [
                    { "kind": "call", "name": "price", "target": "market", "method": "price" },
                    { "kind": "balance", "name": "m0", "addresses": ["maker-0"] }
                ],
                "probe_every_ticks": 2,
                "schedule": "rotate"
            }"#,
        );
        let scenario = load_scenario(&path, &Registry::builtin()).unwrap();
        assert_eq!(scenario.probes.len(), 2);
        assert_eq!(scenario.probe_every_ticks, 2);
        assert_eq!(scenario.assertions.len(), 1);
    }

    #[test]
    fn missing_file_is_scenario_load() {
        let err = load_scenario(Path::new("/nonexistent/scenario.json"), &Registry::builtin())
            .unwrap_err();
        assert_eq!(err.kind_code(), "scenario_load");
    }

    #[test]
    fn structural_failure_is_invalid_scenario() {
        let path = write_doc("broken.json", r#"{ "name": "x", "ticks": 5 }"#);
        let err = load_scenario(&path, &Registry::builtin()).unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }

    #[test]
    fn unknown_agent_type_is_invalid_scenario() {
        let path = write_doc(
            "unknown_agent.json",
            r#"{
                "name": "x",
                "seed": 1,
                "ticks": 5,
                "tick_seconds": 60,
                "pack": "toy_market",
                "agents": [ { "type": "whale", "count": 1 } ]
            }"#,
        );
        let err = load_scenario(&path, &Registry::builtin()).unwrap_err();
        assert_eq!(err.kind_code(), "invalid_scenario");
    }
}
