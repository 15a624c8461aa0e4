//! # Assertions
//!
//! Declarative checks evaluated against a run's final metrics.
//!
//! ## Coercion
//! Metrics coerce to `f64` only here, at comparison time: big integers via
//! their mathematical value (lossy past 2^53), strings by parsing. A metric
//! that is absent or unparsable fails the assertion; it never aborts the run.

use serde::{Deserialize, Serialize};

use af_types::{MetricMap, MetricValue};

use crate::record::FailedAssertion;

/// Comparison operator for an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl AssertionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssertionOp::Eq => "eq",
            AssertionOp::Gt => "gt",
            AssertionOp::Gte => "gte",
            AssertionOp::Lt => "lt",
            AssertionOp::Lte => "lte",
        }
    }

    fn holds(self, actual: f64, expected: f64) -> bool {
        match self {
            AssertionOp::Eq => actual == expected,
            AssertionOp::Gt => actual > expected,
            AssertionOp::Gte => actual >= expected,
            AssertionOp::Lt => actual < expected,
            AssertionOp::Lte => actual <= expected,
        }
    }
}

impl std::fmt::Display for AssertionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared assertion: `<metric> <op> <value>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionSpec {
    pub op: AssertionOp,
    pub metric: String,
    pub value: f64,
}

impl AssertionSpec {
    pub fn new(op: AssertionOp, metric: impl Into<String>, value: f64) -> Self {
        AssertionSpec {
            op,
            metric: metric.into(),
            value,
        }
    }

    /// Evaluate against final metrics. Returns the failure, if any.
    pub fn evaluate(&self, metrics: &MetricMap) -> Option<FailedAssertion> {
        let actual = match metrics.get(&self.metric) {
            Some(v) => v,
            None => {
                return Some(self.fail(None, format!("metric \"{}\" not found", self.metric)));
            }
        };

        match actual.as_f64() {
            Some(n) if self.op.holds(n, self.value) => None,
            Some(n) => Some(self.fail(
                Some(actual.clone()),
                format!(
                    "expected {} {} {}, got {}",
                    self.metric, self.op, self.value, n
                ),
            )),
            None => Some(self.fail(
                Some(actual.clone()),
                format!("metric \"{}\" is not comparable to a number", self.metric),
            )),
        }
    }

    fn fail(&self, actual: Option<MetricValue>, message: String) -> FailedAssertion {
        FailedAssertion {
            op: self.op,
            metric: self.metric.clone(),
            expected: self.value,
            actual_value: actual,
            message,
        }
    }
}

/// Evaluate every assertion (all are always evaluated) and collect failures.
pub fn evaluate_all(specs: &[AssertionSpec], metrics: &MetricMap) -> Vec<FailedAssertion> {
    specs.iter().filter_map(|s| s.evaluate(metrics)).collect()
}
