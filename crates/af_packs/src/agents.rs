//! # Example agents
//!
//! Reference decision-makers for the toy market. Each agent lifts its
//! untyped scenario params into its own typed struct up front; unknown keys
//! are preserved in `extra` for forward compatibility.

use std::sync::Arc;

use af_api::Action;
use af_engine::{Agent, AgentConstructor, AgentCore, TickContext};
use af_types::{ForgeError, ForgeResult, ParamValue, Params};

// ============================================================================
// Random trader
// ============================================================================

/// Typed view of the random trader's parameter bag.
#[derive(Debug, Clone)]
struct TraderParams {
    trade_chance: f64,
    min_amount: i64,
    max_amount: i64,
    cooldown_ticks: u64,
    #[allow(dead_code)]
    extra: Params,
}

impl TraderParams {
    const KNOWN: [&'static str; 4] = ["trade_chance", "min_amount", "max_amount", "cooldown_ticks"];

    fn from_core(core: &AgentCore) -> Self {
        let extra = core
            .params()
            .iter()
            .filter(|(k, _)| !Self::KNOWN.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        TraderParams {
            trade_chance: core.param_f64("trade_chance", 0.5),
            min_amount: core.param_i64("min_amount", 1),
            max_amount: core.param_i64("max_amount", 10),
            cooldown_ticks: core.param_i64("cooldown_ticks", 0).max(0) as u64,
            extra,
        }
    }
}

/// Trades at random: weighted choice between buying, selling, and holding,
/// with an optional cooldown after each trade.
pub struct RandomTrader {
    core: AgentCore,
    params: TraderParams,
}

impl RandomTrader {
    pub fn new(id: &str, params: Params) -> Self {
        let core = AgentCore::new(id, "trader", params);
        let params = TraderParams::from_core(&core);
        RandomTrader { core, params }
    }
}

impl Agent for RandomTrader {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<()> {
        let opening = ctx
            .world
            .get("market.price")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        self.core.remember("opening_price", opening);
        Ok(())
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        if !ctx.rng.chance(self.params.trade_chance) {
            return Ok(None);
        }
        if self.core.is_on_cooldown("trade", ctx.tick) {
            return Ok(None);
        }

        let holdings = ctx
            .world
            .get("agent.holdings")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        // Selling is only worth weighting once something is held.
        let choices = [
            ("buy", 0.5),
            ("sell", if holdings > 0.0 { 0.3 } else { 0.05 }),
            ("hold", 0.2),
        ];
        let choice = *ctx.rng.weighted_pick(&choices)?;

        if choice == "hold" {
            let id = self.core.generate_action_id("hold", ctx.tick);
            return Ok(Some(Action::new(id, "hold", Params::new())));
        }

        let amount = ctx.rng.int_in(self.params.min_amount, self.params.max_amount)?;
        let mut params = Params::new();
        let _ = params.insert("amount".into(), ParamValue::Int(amount));

        if self.params.cooldown_ticks > 0 {
            self.core
                .set_cooldown("trade", self.params.cooldown_ticks, ctx.tick);
        }
        self.core.remember("last_action", choice);

        let id = self.core.generate_action_id(choice, ctx.tick);
        Ok(Some(Action::new(id, choice, params)))
    }
}

/// Constructor for scenario wiring.
pub fn random_trader_constructor() -> AgentConstructor {
    Arc::new(|id, params| Box::new(RandomTrader::new(id, params)))
}

// ============================================================================
// Market maker
// ============================================================================

/// Typed view of the market maker's parameter bag.
#[derive(Debug, Clone)]
struct MakerParams {
    quote_size: i64,
    #[allow(dead_code)]
    rank: i64,
    #[allow(dead_code)]
    extra: Params,
}

impl MakerParams {
    const KNOWN: [&'static str; 2] = ["quote_size", "rank"];

    fn from_core(core: &AgentCore) -> Self {
        let extra = core
            .params()
            .iter()
            .filter(|(k, _)| !Self::KNOWN.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        MakerParams {
            quote_size: core.param_i64("quote_size", 5),
            rank: core.param_i64("rank", 0),
            extra,
        }
    }
}

/// Alternates buys and sells of a fixed size, providing steady flow. The
/// `rank` parameter exists for priority scheduling.
pub struct MarketMaker {
    core: AgentCore,
    params: MakerParams,
}

impl MarketMaker {
    pub fn new(id: &str, params: Params) -> Self {
        let core = AgentCore::new(id, "maker", params);
        let params = MakerParams::from_core(&core);
        MarketMaker { core, params }
    }
}

impl Agent for MarketMaker {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        let bought_last = self
            .core
            .recall("side")
            .and_then(ParamValue::as_str)
            .map(|s| s == "buy")
            .unwrap_or(false);

        let holdings = ctx
            .world
            .get("agent.holdings")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        // Alternate sides, but never quote a sell with nothing to sell.
        let side = if bought_last && holdings >= self.params.quote_size as f64 {
            "sell"
        } else {
            "buy"
        };
        self.core.remember("side", side);

        let mut params = Params::new();
        let _ = params.insert("amount".into(), ParamValue::Int(self.params.quote_size));

        let id = self.core.generate_action_id(side, ctx.tick);
        Ok(Some(Action::new(id, side, params)))
    }
}

/// Constructor for scenario wiring.
pub fn market_maker_constructor() -> AgentConstructor {
    Arc::new(|id, params| Box::new(MarketMaker::new(id, params)))
}

// ============================================================================
// Faulty agent
// ============================================================================

/// Fails every step. Exercises the engine's recovery path: the run must
/// complete with `attempted == failed == ticks` for this agent.
pub struct FaultyAgent {
    core: AgentCore,
}

impl FaultyAgent {
    pub fn new(id: &str, params: Params) -> Self {
        FaultyAgent {
            core: AgentCore::new(id, "faulty", params),
        }
    }
}

impl Agent for FaultyAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn step(&mut self, _ctx: &mut TickContext<'_>) -> ForgeResult<Option<Action>> {
        Err(ForgeError::Agent("intentional failure".into()))
    }
}

/// Constructor for scenario wiring.
pub fn faulty_constructor() -> AgentConstructor {
    Arc::new(|id, params| Box::new(FaultyAgent::new(id, params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_engine::ForgeRng;
    use af_types::{MetricValue, Seed, Tick};

    use crate::toy_market::ToyMarketPack;
    use af_engine::Pack;

    fn ctx<'a>(pack: &'a dyn Pack, tick: u64, seed: u64) -> TickContext<'a> {
        TickContext {
            tick: Tick(tick),
            timestamp: 1_700_000_000.0,
            rng: ForgeRng::new(Seed::new(seed)).derive(Tick(tick), Some("test")),
            world: pack.world_state(),
            pack,
        }
    }

    #[test]
    fn trader_decisions_are_deterministic() {
        let mut pack = ToyMarketPack::new(0.0);
        pack.initialize().unwrap();
        pack.on_tick(Tick(0), 1_700_000_000.0);

        let run = || {
            let mut trader = RandomTrader::new("trader-0", Params::new());
            let mut names = Vec::new();
            for t in 0..30u64 {
                let mut c = ctx(&pack, t, 42);
                let action = trader.step(&mut c).unwrap();
                names.push(action.map(|a| a.name));
            }
            names
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn trader_action_ids_follow_contract() {
        let pack = {
            let mut p = ToyMarketPack::new(0.0);
            p.initialize().unwrap();
            p.on_tick(Tick(0), 1_700_000_000.0);
            p
        };

        let mut params = Params::new();
        let _ = params.insert("trade_chance".into(), ParamValue::Float(1.0));
        let mut trader = RandomTrader::new("trader-0", params);

        let mut c = ctx(&pack, 7, 1);
        let action = trader.step(&mut c).unwrap().unwrap();
        assert!(action.id.starts_with("trader-0-"));
        assert!(action.id.ends_with("-7-0"));
    }

    #[test]
    fn maker_alternates_sides_once_stocked() {
        let mut pack = ToyMarketPack::new(0.0);
        pack.initialize().unwrap();
        pack.on_tick(Tick(0), 1_700_000_000.0);

        let mut maker = MarketMaker::new("maker-0", Params::new());

        // First quote is a buy.
        let mut c = ctx(&pack, 0, 9);
        let first = maker.step(&mut c).unwrap().unwrap();
        assert_eq!(first.name, "buy");
        let _ = pack.execute_action(&first, "maker-0");

        // With inventory on hand the maker flips to sell.
        pack.set_current_agent("maker-0");
        let world = pack.world_state();
        assert!(matches!(
            world.get("agent.holdings"),
            Some(MetricValue::BigInt(h)) if *h > 0
        ));
        let mut c = ctx(&pack, 1, 9);
        let second = maker.step(&mut c).unwrap().unwrap();
        assert_eq!(second.name, "sell");
    }

    #[test]
    fn faulty_agent_always_errors() {
        let pack = ToyMarketPack::new(0.0);
        let mut faulty = FaultyAgent::new("faulty-0", Params::new());
        let mut c = ctx(&pack, 0, 1);
        assert!(faulty.step(&mut c).is_err());
    }

    #[test]
    fn unknown_params_are_preserved_in_extra() {
        let mut params = Params::new();
        let _ = params.insert("trade_chance".into(), ParamValue::Float(0.9));
        let _ = params.insert("strategy_hint".into(), ParamValue::Text("momentum".into()));
        let trader = RandomTrader::new("trader-0", params);
        assert_eq!(trader.params.trade_chance, 0.9);
        assert_eq!(
            trader.params.extra.get("strategy_hint"),
            Some(&ParamValue::Text("momentum".into()))
        );
    }
}
