//! # af_testkit
//!
//! Deterministic testing harness: mock packs, scripted agents, and scenario
//! builders used by the engine and orchestration test suites.
//!
//! ## Usage
//! ```ignore
//! use af_testkit::TestScenario;
//!
//! let scenario = TestScenario::new(42).eager_agents(3).build();
//! let result = af_engine::run(&scenario, &options)?;
//! ```

pub mod mocks;
pub mod scenarios;

pub use mocks::{
    eager_constructor, erroring_constructor, skipping_constructor, CounterPackFactory,
    ExecutionLog, FailingInitPackFactory,
};
pub use scenarios::TestScenario;
