//! # Run report
//!
//! Deterministic markdown for one finished run: outcome, final metrics,
//! agent statistics, and action-name frequencies. A pure function of the
//! run directory's contents — generating it twice is byte-identical.

use std::collections::BTreeMap;
use std::path::Path;

use af_types::ForgeResult;

use crate::loader::load_run;
use crate::markdown::{fmt_num, table};

/// Generate the markdown report for a run directory.
pub fn generate_run_report(run_dir: &Path) -> ForgeResult<String> {
    let run = load_run(run_dir)?;
    let summary = &run.summary;

    let mut out = String::new();
    out.push_str(&format!("# Run Report: {}\n\n", summary.run_id));

    out.push_str("## Outcome\n\n");
    out.push_str(&table(
        &["field", "value"],
        &[
            vec!["scenario".into(), summary.scenario_name.clone()],
            vec!["seed".into(), summary.seed.to_string()],
            vec!["ticks".into(), summary.ticks.to_string()],
            vec!["success".into(), summary.success.to_string()],
            vec![
                "failedAssertions".into(),
                summary.failed_assertions.len().to_string(),
            ],
            vec!["durationMs".into(), summary.duration_ms.to_string()],
        ],
    ));
    out.push('\n');

    if !summary.failed_assertions.is_empty() {
        out.push_str("## Failed Assertions\n\n");
        let rows: Vec<Vec<String>> = summary
            .failed_assertions
            .iter()
            .map(|f| {
                vec![
                    f.metric.clone(),
                    f.op.to_string(),
                    fmt_num(f.expected),
                    f.actual_value
                        .as_ref()
                        .map(|v| v.to_csv_field())
                        .unwrap_or_else(|| "-".into()),
                    f.message.clone(),
                ]
            })
            .collect();
        out.push_str(&table(
            &["metric", "op", "expected", "actual", "message"],
            &rows,
        ));
        out.push('\n');
    }

    out.push_str("## Final Metrics\n\n");
    if summary.final_metrics.is_empty() {
        out.push_str("No metrics captured.\n");
    } else {
        let rows: Vec<Vec<String>> = summary
            .final_metrics
            .iter()
            .map(|(name, value)| vec![name.clone(), value.to_csv_field()])
            .collect();
        out.push_str(&table(&["metric", "value"], &rows));
    }
    out.push('\n');

    out.push_str("## Agent Statistics\n\n");
    let rows: Vec<Vec<String>> = summary
        .agent_stats
        .iter()
        .map(|s| {
            vec![
                s.agent_id.clone(),
                s.agent_type.clone(),
                s.attempted.to_string(),
                s.succeeded.to_string(),
                s.failed.to_string(),
            ]
        })
        .collect();
    out.push_str(&table(
        &["agent", "type", "attempted", "succeeded", "failed"],
        &rows,
    ));
    out.push('\n');

    out.push_str("## Action Frequencies\n\n");
    let frequencies = action_frequencies(&run.actions);
    if frequencies.is_empty() {
        out.push_str("No actions executed.\n");
    } else {
        let rows: Vec<Vec<String>> = frequencies
            .iter()
            .map(|(name, count)| vec![name.clone(), count.to_string()])
            .collect();
        out.push_str(&table(&["action", "count"], &rows));
    }

    Ok(out)
}

/// Action-name counts in name order.
pub fn action_frequencies(records: &[af_api::record::ActionRecord]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        if let Some(action) = &record.action {
            *counts.entry(action.name.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Counts of business-failure reasons in reason order.
pub fn revert_reasons(records: &[af_api::record::ActionRecord]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        if let Some(result) = &record.result {
            if !result.ok {
                let reason = result.error.clone().unwrap_or_else(|| "unknown".into());
                *counts.entry(reason).or_insert(0) += 1;
            }
        }
    }
    counts
}
