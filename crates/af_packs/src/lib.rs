//! # af_packs
//!
//! Reference material: a deterministic toy-market pack and a few example
//! agents. Nothing in the kernel depends on this crate; it backs the CLI's
//! `--toy` flag and the concrete scenarios in the test suites.

pub mod agents;
pub mod toy_market;

use std::sync::Arc;

use af_api::{AssertionOp, AssertionSpec};
use af_engine::{Scenario, ScenarioBuilder};
use af_types::{ForgeResult, ParamValue, Params};

use agents::{faulty_constructor, market_maker_constructor, random_trader_constructor};
use toy_market::ToyMarketFactory;

/// The stock toy-market scenario: three random traders, two market makers,
/// and a volume assertion. Seed and ticks come from the caller (CLI flags
/// or test).
pub fn toy_scenario(seed: u64, ticks: u64) -> ForgeResult<Scenario> {
    let mut trader_params = Params::new();
    let _ = trader_params.insert("trade_chance".into(), ParamValue::Float(0.7));
    let _ = trader_params.insert("min_amount".into(), ParamValue::Int(1));
    let _ = trader_params.insert("max_amount".into(), ParamValue::Int(10));

    let mut maker_params = Params::new();
    let _ = maker_params.insert("rank".into(), ParamValue::Int(10));
    let _ = maker_params.insert("quote_size".into(), ParamValue::Int(5));

    ScenarioBuilder::new("toy-market")
        .seed(seed)
        .ticks(ticks)
        .tick_seconds(3_600.0)
        .pack(Arc::new(ToyMarketFactory::default()))
        .agents("trader", 3, trader_params, random_trader_constructor())
        .agents("maker", 2, maker_params, market_maker_constructor())
        .assertion(AssertionSpec::new(AssertionOp::Gt, "totalVolume", 0.0))
        .build()
}

/// Toy scenario plus one always-failing agent, for failure-path testing.
pub fn toy_scenario_with_faulty(seed: u64, ticks: u64) -> ForgeResult<Scenario> {
    let mut trader_params = Params::new();
    let _ = trader_params.insert("trade_chance".into(), ParamValue::Float(0.7));

    ScenarioBuilder::new("toy-market-faulty")
        .seed(seed)
        .ticks(ticks)
        .pack(Arc::new(ToyMarketFactory::default()))
        .agents("trader", 2, trader_params, random_trader_constructor())
        .agents("faulty", 1, Params::new(), faulty_constructor())
        .build()
}
