//! # Scenarios
//!
//! Builders for common test setups around [`CounterPackFactory`].

use std::sync::Arc;

use af_api::{AssertionOp, AssertionSpec};
use af_engine::{
    CheckpointConfig, MetricsConfig, Scenario, ScenarioBuilder, ScheduleStrategy,
};
use af_types::{ParamValue, Params};

use crate::mocks::{
    eager_constructor, erroring_constructor, skipping_constructor, CounterPackFactory,
    ExecutionLog,
};

/// Builder for counter-pack test scenarios.
pub struct TestScenario {
    seed: u64,
    ticks: u64,
    eager: u32,
    skippers: u32,
    erroring: u32,
    sample_every: u64,
    schedule: ScheduleStrategy,
    checkpoints: Option<CheckpointConfig>,
    assertions: Vec<AssertionSpec>,
    factory: Arc<CounterPackFactory>,
}

impl TestScenario {
    pub fn new(seed: u64) -> Self {
        TestScenario {
            seed,
            ticks: 10,
            eager: 1,
            skippers: 0,
            erroring: 0,
            sample_every: 1,
            schedule: ScheduleStrategy::Shuffle,
            checkpoints: None,
            assertions: Vec::new(),
            factory: Arc::new(CounterPackFactory::new()),
        }
    }

    pub fn ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn eager_agents(mut self, count: u32) -> Self {
        self.eager = count;
        self
    }

    pub fn skipping_agents(mut self, count: u32) -> Self {
        self.skippers = count;
        self
    }

    pub fn erroring_agents(mut self, count: u32) -> Self {
        self.erroring = count;
        self
    }

    pub fn sample_every(mut self, every: u64) -> Self {
        self.sample_every = every;
        self
    }

    pub fn schedule(mut self, schedule: ScheduleStrategy) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn checkpoints(mut self, config: CheckpointConfig) -> Self {
        self.checkpoints = Some(config);
        self
    }

    pub fn assert_gt(mut self, metric: &str, value: f64) -> Self {
        self.assertions
            .push(AssertionSpec::new(AssertionOp::Gt, metric, value));
        self
    }

    pub fn assert_eq(mut self, metric: &str, value: f64) -> Self {
        self.assertions
            .push(AssertionSpec::new(AssertionOp::Eq, metric, value));
        self
    }

    /// The shared execution log of the scenario's pack factory.
    pub fn execution_log(&self) -> ExecutionLog {
        self.factory.log()
    }

    /// Build the scenario. Panics on invalid configuration, which in a test
    /// harness is the failure we want.
    pub fn build(self) -> Scenario {
        let mut params = Params::new();
        let _ = params.insert("rank".into(), ParamValue::Int(0));

        let mut builder = ScenarioBuilder::new("testkit")
            .seed(self.seed)
            .ticks(self.ticks)
            .tick_seconds(60.0)
            .pack(self.factory.clone())
            .metrics(MetricsConfig {
                sample_every_ticks: self.sample_every,
                allow_list: None,
            })
            .schedule(self.schedule);

        if self.eager > 0 {
            builder = builder.agents("eager", self.eager, params.clone(), eager_constructor());
        }
        if self.skippers > 0 {
            builder = builder.agents("skipper", self.skippers, Params::new(), skipping_constructor());
        }
        if self.erroring > 0 {
            builder = builder.agents("erroring", self.erroring, Params::new(), erroring_constructor());
        }

        if let Some(cp) = self.checkpoints {
            builder = builder.checkpoints(cp);
        }
        for assertion in self.assertions {
            builder = builder.assertion(assertion);
        }

        builder.build().expect("test scenario must be valid")
    }
}
