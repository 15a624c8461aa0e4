//! # Values
//!
//! Heterogeneous value unions for metrics and agent parameters.
//!
//! ## Metric values
//! A metric is a number, a big integer, or a string. Big integers are
//! serialized as base-10 strings on every emission path; coercion to `f64`
//! happens only at assertion time and is lossy past 2^53.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// An ordered metric map. Key order (and therefore emission order) is the
/// natural string order; emission paths never iterate unordered containers.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// Agent/pack parameter bag, as declared by the scenario.
pub type Params = BTreeMap<String, ParamValue>;

// ============================================================================
// MetricValue
// ============================================================================

/// A single metric value: number, big integer, or text.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A plain floating-point value
    Number(f64),
    /// An integer beyond safe float range (e.g. token balances, gas)
    BigInt(i128),
    /// An opaque string value
    Text(String),
}

impl MetricValue {
    /// Coerce to `f64` for assertion comparison.
    ///
    /// - `Number` is itself
    /// - `BigInt` converts through its mathematical value (lossy past 2^53)
    /// - `Text` parses as a float
    ///
    /// Returns `None` when the text does not parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::BigInt(i) => Some(*i as f64),
            MetricValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Render for a CSV field. Quoting is the emitter's concern.
    pub fn to_csv_field(&self) -> String {
        match self {
            MetricValue::Number(n) => format!("{}", n),
            MetricValue::BigInt(i) => i.to_string(),
            MetricValue::Text(s) => s.clone(),
        }
    }
}

/// Display matches the CSV field rendering so reports and logs agree.
impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_csv_field())
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<i128> for MetricValue {
    fn from(v: i128) -> Self {
        MetricValue::BigInt(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(n) => serializer.serialize_f64(*n),
            MetricValue::BigInt(i) => serializer.serialize_str(&i.to_string()),
            MetricValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = MetricValue;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a number or a string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MetricValue, E> {
                Ok(MetricValue::Number(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MetricValue, E> {
                Ok(MetricValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MetricValue, E> {
                Ok(MetricValue::Number(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MetricValue, E> {
                // Big integers round-trip through their string form.
                if let Ok(i) = v.parse::<i128>() {
                    if i64::try_from(i).is_err() {
                        return Ok(MetricValue::BigInt(i));
                    }
                }
                Ok(MetricValue::Text(v.to_string()))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

// ============================================================================
// ParamValue
// ============================================================================

/// Generic parameter value for scenario-declared agent/pack configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Null
    }
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}
