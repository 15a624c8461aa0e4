//! # af_engine (layer 3)
//!
//! The simulation kernel: seeded hierarchical PRNG, the pack and agent
//! contracts, intra-tick scheduling, metric and probe sampling, scenario
//! definition, and the engine that orchestrates a run end to end.
//!
//! ## Rules
//! - No wall clock on any path that affects artifact bytes
//! - No iteration over unordered containers on emission paths
//! - Single-threaded within a run; agents execute serially

pub mod agent;
pub mod context;
pub mod engine;
pub mod metrics;
pub mod pack;
pub mod probes;
pub mod rng;
pub mod scenario;
pub mod scheduler;

pub use agent::{Agent, AgentCore};
pub use context::TickContext;
pub use engine::{initial_timestamp, run, RunOptions};
pub use metrics::MetricsCollector;
pub use pack::{Pack, PackFactory};
pub use probes::{ComputedProbeFn, ProbeKind, ProbeSampler, ProbeSpec, ProbeValues};
pub use rng::ForgeRng;
pub use scenario::{
    AgentConstructor, AgentSpec, CheckpointConfig, MetricsConfig, Scenario, ScenarioBuilder,
};
pub use scheduler::{PriorityFn, ScheduleStrategy, Scheduler};
