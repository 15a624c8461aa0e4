//! # Actions
//!
//! What agents propose and how packs answer.
//!
//! ## Rules
//! - Action ids are deterministic: `<agent_id>-<name>-<tick>-<k>` with a
//!   per-agent monotone counter `k`, never wall-clock derived
//! - Business-logic failures are `ok: false` results, never errors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use af_types::Params;

/// An action proposed by an agent for the current tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Deterministic id: `<agent_id>-<name>-<tick>-<k>`
    pub id: String,
    /// Action name, interpreted by the pack
    pub name: String,
    /// Action arguments
    #[serde(default)]
    pub params: Params,
    /// Opaque metadata carried through untouched (not part of the action log)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Params>,
}

impl Action {
    pub fn new(id: impl Into<String>, name: impl Into<String>, params: Params) -> Self {
        Action {
            id: id.into(),
            name: name.into(),
            params,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Params) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A protocol event raised while executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub name: String,
    #[serde(default)]
    pub args: Params,
}

/// The pack's answer to one executed action.
///
/// `ok: false` carries a business-logic failure; the tick continues and the
/// agent records a failure. Packs never signal business failures any other
/// way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ActionEvent>,
    /// Signed balance movements keyed by a pack-defined convention
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub balance_deltas: BTreeMap<String, i128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl ActionResult {
    /// A successful result with no attachments.
    pub fn success() -> Self {
        ActionResult {
            ok: true,
            error: None,
            events: Vec::new(),
            balance_deltas: BTreeMap::new(),
            gas_used: None,
            tx_hash: None,
        }
    }

    /// A business-logic failure with a reason.
    pub fn failure(error: impl Into<String>) -> Self {
        ActionResult {
            ok: false,
            error: Some(error.into()),
            events: Vec::new(),
            balance_deltas: BTreeMap::new(),
            gas_used: None,
            tx_hash: None,
        }
    }

    pub fn with_event(mut self, event: ActionEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_balance_delta(mut self, key: impl Into<String>, delta: i128) -> Self {
        let _ = self.balance_deltas.insert(key.into(), delta);
        self
    }

    pub fn with_gas(mut self, gas: u128) -> Self {
        self.gas_used = Some(gas);
        self
    }

    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }
}
