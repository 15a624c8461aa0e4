//! # Registry
//!
//! Maps pack labels and agent type tags to constructors. Scenario documents
//! reference these names; unknown names are `InvalidScenario`.

use std::collections::BTreeMap;
use std::sync::Arc;

use af_engine::{AgentConstructor, PackFactory};
use af_packs::agents::{faulty_constructor, market_maker_constructor, random_trader_constructor};
use af_packs::toy_market::ToyMarketFactory;
use af_types::{ForgeError, ForgeResult, Params};

/// Builds a pack factory from the scenario-supplied config object.
pub type PackFactoryBuilder = Arc<dyn Fn(&Params) -> ForgeResult<Arc<dyn PackFactory>> + Send + Sync>;

/// Name-to-constructor tables for packs and agent types.
pub struct Registry {
    packs: BTreeMap<String, PackFactoryBuilder>,
    agents: BTreeMap<String, AgentConstructor>,
}

impl Registry {
    /// An empty registry (for embedders that bring their own worlds).
    pub fn new() -> Self {
        Registry {
            packs: BTreeMap::new(),
            agents: BTreeMap::new(),
        }
    }

    /// The built-in registry: the toy market and the example agents.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();

        registry.register_pack(
            "toy_market",
            Arc::new(|config: &Params| {
                let volatility = config
                    .get("volatility")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.02);
                Ok(Arc::new(ToyMarketFactory::with_volatility(volatility))
                    as Arc<dyn PackFactory>)
            }),
        );

        registry.register_agent("trader", random_trader_constructor());
        registry.register_agent("maker", market_maker_constructor());
        registry.register_agent("faulty", faulty_constructor());

        registry
    }

    pub fn register_pack(&mut self, label: impl Into<String>, builder: PackFactoryBuilder) {
        let _ = self.packs.insert(label.into(), builder);
    }

    pub fn register_agent(&mut self, type_tag: impl Into<String>, constructor: AgentConstructor) {
        let _ = self.agents.insert(type_tag.into(), constructor);
    }

    /// Resolve a pack label plus config into a factory.
    pub fn pack(&self, label: &str, config: &Params) -> ForgeResult<Arc<dyn PackFactory>> {
        let builder = self.packs.get(label).ok_or_else(|| {
            ForgeError::InvalidScenario(format!("unknown pack \"{}\"", label))
        })?;
        builder(config)
    }

    /// Resolve an agent type tag into its constructor.
    pub fn agent(&self, type_tag: &str) -> ForgeResult<AgentConstructor> {
        self.agents.get(type_tag).cloned().ok_or_else(|| {
            ForgeError::InvalidScenario(format!("unknown agent type \"{}\"", type_tag))
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
