//! # Toy market
//!
//! A small deterministic order-flow world: one priced asset, per-agent
//! currency balances and holdings, and `buy` / `sell` / `hold` actions.
//!
//! Price drift is seeded from the first tick's timestamp, which is itself a
//! pure function of the run seed, so the pack honors the determinism
//! contract without ever touching an ambient random source.

use std::collections::BTreeMap;

use tracing::debug;

use af_api::{Action, ActionEvent, ActionResult, WorldState, WORLD_TIMESTAMP_KEY};
use af_engine::{ForgeRng, Pack, PackFactory};
use af_types::{ForgeResult, MetricMap, MetricValue, Seed, Tick};

/// Starting currency balance granted to every agent on first contact.
const STARTING_BALANCE: i128 = 1_000_000;
/// Starting asset price.
const STARTING_PRICE: f64 = 100.0;
/// Base gas charged per executed trade.
const TRADE_GAS: u128 = 21_000;

/// Builds fresh [`ToyMarketPack`] instances; one per run.
#[derive(Debug, Clone)]
pub struct ToyMarketFactory {
    /// Per-tick price drift bound (fraction of price)
    pub volatility: f64,
}

impl Default for ToyMarketFactory {
    fn default() -> Self {
        ToyMarketFactory { volatility: 0.02 }
    }
}

impl ToyMarketFactory {
    pub fn with_volatility(volatility: f64) -> Self {
        ToyMarketFactory { volatility }
    }
}

impl PackFactory for ToyMarketFactory {
    fn label(&self) -> &str {
        "toy_market"
    }

    fn build(&self) -> Box<dyn Pack> {
        Box::new(ToyMarketPack::new(self.volatility))
    }
}

/// The toy-market world state.
pub struct ToyMarketPack {
    volatility: f64,
    price: f64,
    tick: Tick,
    timestamp: f64,
    balances: BTreeMap<String, i128>,
    holdings: BTreeMap<String, i128>,
    total_volume: f64,
    trade_count: u64,
    error_count: u64,
    drift: Option<ForgeRng>,
    current_agent: Option<String>,
}

impl ToyMarketPack {
    pub fn new(volatility: f64) -> Self {
        ToyMarketPack {
            volatility,
            price: STARTING_PRICE,
            tick: Tick::ZERO,
            timestamp: 0.0,
            balances: BTreeMap::new(),
            holdings: BTreeMap::new(),
            total_volume: 0.0,
            trade_count: 0,
            error_count: 0,
            drift: None,
            current_agent: None,
        }
    }

    fn balance_entry(&mut self, agent_id: &str) -> &mut i128 {
        self.balances
            .entry(agent_id.to_string())
            .or_insert(STARTING_BALANCE)
    }

    fn amount_param(action: &Action) -> Option<i64> {
        action.params.get("amount").and_then(|v| v.as_i64())
    }

    /// `cost` is the signed balance movement (positive = agent pays).
    fn trade_result(&mut self, agent_id: &str, amount: i64, cost: i128) -> ActionResult {
        self.trade_count += 1;
        self.total_volume += cost.unsigned_abs() as f64;

        let mut args = af_types::Params::new();
        let _ = args.insert("amount".into(), af_types::ParamValue::Int(amount));
        let _ = args.insert(
            "price".into(),
            af_types::ParamValue::Float(self.price),
        );

        ActionResult::success()
            .with_event(ActionEvent {
                name: "Trade".into(),
                args,
            })
            .with_balance_delta(agent_id, -cost)
            .with_gas(TRADE_GAS + amount.unsigned_abs() as u128 * 10)
            .with_tx_hash(format!("0x{:016x}", self.trade_count))
    }

    fn execute_buy(&mut self, action: &Action, agent_id: &str) -> ActionResult {
        let amount = match Self::amount_param(action) {
            Some(a) if a > 0 => a,
            _ => {
                self.error_count += 1;
                return ActionResult::failure("buy requires a positive amount");
            }
        };

        let cost = (amount as f64 * self.price).round() as i128;
        let balance = *self.balance_entry(agent_id);
        if balance < cost {
            self.error_count += 1;
            return ActionResult::failure("insufficient balance");
        }

        *self.balance_entry(agent_id) -= cost;
        *self
            .holdings
            .entry(agent_id.to_string())
            .or_insert(0) += amount as i128;

        self.trade_result(agent_id, amount, cost)
    }

    fn execute_sell(&mut self, action: &Action, agent_id: &str) -> ActionResult {
        let amount = match Self::amount_param(action) {
            Some(a) if a > 0 => a,
            _ => {
                self.error_count += 1;
                return ActionResult::failure("sell requires a positive amount");
            }
        };

        let held = self.holdings.get(agent_id).copied().unwrap_or(0);
        if held < amount as i128 {
            self.error_count += 1;
            return ActionResult::failure("insufficient holdings");
        }

        let proceeds = (amount as f64 * self.price).round() as i128;
        *self
            .holdings
            .entry(agent_id.to_string())
            .or_insert(0) -= amount as i128;
        *self.balance_entry(agent_id) += proceeds;

        self.trade_result(agent_id, amount, -proceeds)
    }
}

impl Pack for ToyMarketPack {
    fn name(&self) -> &str {
        "toy_market"
    }

    fn initialize(&mut self) -> ForgeResult<()> {
        self.price = STARTING_PRICE;
        self.tick = Tick::ZERO;
        self.balances.clear();
        self.holdings.clear();
        self.total_volume = 0.0;
        self.trade_count = 0;
        self.error_count = 0;
        self.drift = None;
        self.current_agent = None;
        Ok(())
    }

    fn on_tick(&mut self, tick: Tick, timestamp: f64) {
        self.tick = tick;
        self.timestamp = timestamp;

        // First tick anchors the drift stream; the timestamp is a pure
        // function of the run seed.
        let drift = self
            .drift
            .get_or_insert_with(|| ForgeRng::new(Seed::new(timestamp as u64)));
        let swing = (drift.next_float() * 2.0 - 1.0) * self.volatility;
        self.price = (self.price * (1.0 + swing)).max(1.0);

        debug!(tick = tick.as_u64(), price = self.price, "market tick");
    }

    fn set_current_agent(&mut self, agent_id: &str) {
        self.current_agent = Some(agent_id.to_string());
    }

    fn world_state(&self) -> WorldState {
        let mut world = WorldState::new();
        let _ = world.insert(
            WORLD_TIMESTAMP_KEY.into(),
            MetricValue::Number(self.timestamp),
        );
        let _ = world.insert("market.price".into(), MetricValue::Number(self.price));
        let _ = world.insert(
            "market.volume".into(),
            MetricValue::Number(self.total_volume),
        );
        if let Some(agent_id) = &self.current_agent {
            let balance = self.balances.get(agent_id).copied().unwrap_or(STARTING_BALANCE);
            let held = self.holdings.get(agent_id).copied().unwrap_or(0);
            let _ = world.insert("agent.balance".into(), MetricValue::BigInt(balance));
            let _ = world.insert("agent.holdings".into(), MetricValue::BigInt(held));
        }
        world
    }

    fn execute_action(&mut self, action: &Action, agent_id: &str) -> ActionResult {
        match action.name.as_str() {
            "buy" => self.execute_buy(action, agent_id),
            "sell" => self.execute_sell(action, agent_id),
            "hold" => ActionResult::success(),
            other => {
                self.error_count += 1;
                ActionResult::failure(format!("unknown action \"{}\"", other))
            }
        }
    }

    fn metrics(&self) -> MetricMap {
        let mut m = MetricMap::new();
        let _ = m.insert("totalVolume".into(), MetricValue::Number(self.total_volume));
        let _ = m.insert(
            "tradeCount".into(),
            MetricValue::Number(self.trade_count as f64),
        );
        let _ = m.insert(
            "errors".into(),
            MetricValue::Number(self.error_count as f64),
        );
        let _ = m.insert("price".into(), MetricValue::Number(self.price));
        for (agent_id, balance) in &self.balances {
            let _ = m.insert(
                format!("balance_{}", agent_id),
                MetricValue::BigInt(*balance),
            );
        }
        m
    }

    fn cleanup(&mut self) {
        self.current_agent = None;
    }
}
