//! Output formatting: metric value lines and the graph definitions document.
//!
//! Value lines are `<key>\t<value>\t<unix seconds>`. The definitions document
//! is a JSON object written after [`DEFINITIONS_MARKER`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{GraphSpec, Unit};

/// First line of the definitions output.
pub const DEFINITIONS_MARKER: &str = "# mackerel-agent-plugin";

/// A computed value that cannot be reported (NaN or infinite).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidValue(pub f64);

impl std::fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value: {}", self.0)
    }
}

impl std::error::Error for InvalidValue {}

/// Formats a metric value.
///
/// Integral values render without a fractional part (`60`), everything else
/// with the shortest representation that round-trips (`0.125`).
pub fn format_value(value: f64) -> Result<String, InvalidValue> {
    if !value.is_finite() {
        return Err(InvalidValue(value));
    }
    // i64 covers every integral value a counter rate can reach.
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Ok(format!("{}", value as i64))
    } else {
        Ok(format!("{}", value))
    }
}

/// Joins the non-empty segments of a metric key with `.`.
pub fn metric_key(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// Formats one output line, including the trailing newline.
pub fn format_line(key: &str, value: f64, timestamp: i64) -> Result<String, InvalidValue> {
    Ok(format!("{}\t{}\t{}\n", key, format_value(value)?, timestamp))
}

/// Derives a human readable label from a metric or graph name:
/// `disk.time.#` → `Disk Time`.
pub fn title(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        let c = match c {
            '.' | '_' => ' ',
            '*' | '#' => continue,
            c => c,
        };
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out.trim().to_string()
}

/// Graph definitions document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDefinitions {
    pub graphs: BTreeMap<String, GraphDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDefinition {
    pub label: String,
    pub unit: Unit,
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDefinition {
    pub name: String,
    pub label: String,
    pub stacked: bool,
}

/// Builds the definitions document, qualifying graph names with `prefix`
/// and filling in missing labels.
pub fn definitions(prefix: &str, graphs: &[GraphSpec]) -> GraphDefinitions {
    let graphs = graphs
        .iter()
        .map(|graph| {
            let key = metric_key(&[prefix, graph.name.as_str()]);
            let label = graph.label.clone().unwrap_or_else(|| title(&key));
            let metrics = graph
                .metrics
                .iter()
                .map(|m| MetricDefinition {
                    name: m.name.clone(),
                    label: m.label.clone().unwrap_or_else(|| title(&m.name)),
                    stacked: m.stacked,
                })
                .collect();
            (
                key,
                GraphDefinition {
                    label,
                    unit: graph.unit,
                    metrics,
                },
            )
        })
        .collect();

    GraphDefinitions { graphs }
}
