//! # Probes
//!
//! Custom computed metrics sampled at fixed intervals and optionally folded
//! into checkpoints.
//!
//! ## Rules
//! - Probes evaluate in declaration order; a computed probe sees the values
//!   of probes declared before it (and nothing later)
//! - A failing probe becomes `null` with a warning; later probes still run

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use af_types::{ForgeResult, MetricValue};

use crate::pack::Pack;

/// Values sampled so far this tick, in declaration order.
pub type ProbeValues = BTreeMap<String, Option<MetricValue>>;

/// A pure function of the pack and the probes already sampled this tick.
pub type ComputedProbeFn =
    Arc<dyn Fn(&dyn Pack, &ProbeValues) -> ForgeResult<MetricValue> + Send + Sync>;

/// What a probe measures.
#[derive(Clone)]
pub enum ProbeKind {
    /// Arbitrary computed value
    Computed(ComputedProbeFn),
    /// Look up `"<target>.<method>"` in the pack's world state
    Call { target: String, method: String },
    /// Look up conventional `balance[_token]_<addr>` keys in pack metrics
    Balance {
        addresses: Vec<String>,
        token: Option<String>,
    },
}

impl std::fmt::Debug for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Computed(_) => f.write_str("Computed"),
            ProbeKind::Call { target, method } => write!(f, "Call({}.{})", target, method),
            ProbeKind::Balance { addresses, token } => {
                write!(f, "Balance({:?}, token={:?})", addresses, token)
            }
        }
    }
}

/// One declared probe.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    pub name: String,
    pub kind: ProbeKind,
}

impl ProbeSpec {
    pub fn computed(name: impl Into<String>, f: ComputedProbeFn) -> Self {
        ProbeSpec {
            name: name.into(),
            kind: ProbeKind::Computed(f),
        }
    }

    pub fn call(name: impl Into<String>, target: impl Into<String>, method: impl Into<String>) -> Self {
        ProbeSpec {
            name: name.into(),
            kind: ProbeKind::Call {
                target: target.into(),
                method: method.into(),
            },
        }
    }

    pub fn balance(name: impl Into<String>, addresses: Vec<String>, token: Option<String>) -> Self {
        ProbeSpec {
            name: name.into(),
            kind: ProbeKind::Balance {
                addresses,
                token,
            },
        }
    }

    /// Kind label recorded in the resolved configuration.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ProbeKind::Computed(_) => "computed",
            ProbeKind::Call { .. } => "call",
            ProbeKind::Balance { .. } => "balance",
        }
    }
}

/// Evaluates all declared probes against the pack.
#[derive(Debug)]
pub struct ProbeSampler {
    probes: Vec<ProbeSpec>,
}

impl ProbeSampler {
    pub fn new(probes: Vec<ProbeSpec>) -> Self {
        ProbeSampler { probes }
    }

    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    /// Sample every probe in declaration order. Failures become `null`.
    pub fn sample(&self, pack: &dyn Pack) -> ProbeValues {
        let mut sampled = ProbeValues::new();

        for probe in &self.probes {
            let value = match &probe.kind {
                ProbeKind::Computed(f) => match f(pack, &sampled) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        warn!(probe = %probe.name, kind = e.kind_code(), "probe failed: {}", e);
                        None
                    }
                },
                ProbeKind::Call { target, method } => {
                    let key = format!("{}.{}", target, method);
                    pack.world_state().get(&key).cloned()
                }
                ProbeKind::Balance { addresses, token } => {
                    Self::sum_balances(pack, addresses, token.as_deref())
                }
            };
            let _ = sampled.insert(probe.name.clone(), value);
        }

        sampled
    }

    /// Sum the balances found under the conventional metric keys. All-big-int
    /// sums stay exact; any float in the mix demotes the sum to a number.
    fn sum_balances(pack: &dyn Pack, addresses: &[String], token: Option<&str>) -> Option<MetricValue> {
        let metrics = pack.metrics();
        let mut found = Vec::new();

        for addr in addresses {
            let key = match token {
                Some(t) => format!("balance_{}_{}", t, addr),
                None => format!("balance_{}", addr),
            };
            if let Some(v) = metrics.get(&key) {
                found.push(v.clone());
            }
        }

        if found.is_empty() {
            return None;
        }

        if found.iter().all(|v| matches!(v, MetricValue::BigInt(_))) {
            let total: i128 = found
                .iter()
                .map(|v| match v {
                    MetricValue::BigInt(i) => *i,
                    _ => 0,
                })
                .sum();
            return Some(MetricValue::BigInt(total));
        }

        let total: f64 = found.iter().filter_map(MetricValue::as_f64).sum();
        Some(MetricValue::Number(total))
    }
}
