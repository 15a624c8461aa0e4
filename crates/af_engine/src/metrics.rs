//! # Metrics collector
//!
//! Periodic sampling of pack metrics plus the forced final snapshot.
//!
//! ## Rules
//! - A tick is sampled iff `tick % sample_every_ticks == 0`
//! - The forced final sample ignores the cadence but never duplicates a
//!   tick already captured, so CSV rows stay strictly increasing by tick
//! - CSV columns appear in first-seen order across samples

use std::collections::BTreeSet;

use af_api::MetricsSample;
use af_artifacts::csv::escape_field;
use af_types::{MetricMap, Tick};

use crate::pack::Pack;

/// Collects metric samples over the course of one run.
#[derive(Debug)]
pub struct MetricsCollector {
    sample_every: u64,
    allow_list: Option<BTreeSet<String>>,
    samples: Vec<MetricsSample>,
    /// Column order for CSV emission: first-seen across samples
    columns: Vec<String>,
    last_sampled: Option<Tick>,
}

impl MetricsCollector {
    /// `sample_every` below 1 is treated as 1.
    pub fn new(sample_every: u64, allow_list: Option<Vec<String>>) -> Self {
        MetricsCollector {
            sample_every: sample_every.max(1),
            allow_list: allow_list.map(|names| names.into_iter().collect()),
            samples: Vec::new(),
            columns: Vec::new(),
            last_sampled: None,
        }
    }

    pub fn should_sample(&self, tick: Tick) -> bool {
        tick.as_u64() % self.sample_every == 0
    }

    /// Periodic sample: captures iff the cadence predicate holds and this
    /// tick has not already been captured.
    pub fn sample(&mut self, tick: Tick, timestamp: f64, pack: &dyn Pack) {
        if self.should_sample(tick) && self.last_sampled != Some(tick) {
            self.capture(tick, timestamp, pack);
        }
    }

    /// Unconditional capture for the final tick (deduplicated by tick).
    pub fn force_sample(&mut self, tick: Tick, timestamp: f64, pack: &dyn Pack) {
        if self.last_sampled != Some(tick) {
            self.capture(tick, timestamp, pack);
        }
    }

    fn capture(&mut self, tick: Tick, timestamp: f64, pack: &dyn Pack) {
        let mut metrics = pack.metrics();
        if let Some(allow) = &self.allow_list {
            metrics.retain(|name, _| allow.contains(name));
        }

        for name in metrics.keys() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }

        self.samples.push(MetricsSample {
            tick,
            timestamp,
            metrics,
        });
        self.last_sampled = Some(tick);
    }

    /// The last sample's metric map, or empty when nothing was captured.
    pub fn final_metrics(&self) -> MetricMap {
        self.samples
            .last()
            .map(|s| s.metrics.clone())
            .unwrap_or_default()
    }

    pub fn samples(&self) -> &[MetricsSample] {
        &self.samples
    }

    /// Emit the metrics table: LF line endings, empty fields for missing
    /// values, big-integers as base-10 strings, one final LF.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("tick,timestamp");
        for column in &self.columns {
            out.push(',');
            out.push_str(&escape_field(column));
        }
        out.push('\n');

        for sample in &self.samples {
            out.push_str(&sample.tick.as_u64().to_string());
            out.push(',');
            out.push_str(&format!("{}", sample.timestamp));
            for column in &self.columns {
                out.push(',');
                if let Some(value) = sample.metrics.get(column) {
                    out.push_str(&escape_field(&value.to_csv_field()));
                }
            }
            out.push('\n');
        }

        out
    }
}
