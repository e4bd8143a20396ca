//! Declarative graph and metric definitions.

use serde::Serialize;

use crate::fmt::title;

/// Graph units understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "seconds")]
    Seconds,
    #[serde(rename = "milliseconds")]
    Milliseconds,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "bytes/sec")]
    BytesPerSecond,
    #[serde(rename = "bits")]
    Bits,
    #[serde(rename = "bits/sec")]
    BitsPerSecond,
    #[serde(rename = "iops")]
    Iops,
}

/// One metric of a graph.
///
/// `name` is relative to the graph name and may contain `*` or `#`
/// wildcards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSpec {
    pub name: String,
    pub label: Option<String>,
    /// Report the change since the previous run instead of the raw value.
    pub diff: bool,
    /// For diff metrics: per second, otherwise per minute.
    pub per_second: bool,
    /// Multiplier applied after the diff step.
    pub scale: Option<f64>,
    pub stacked: bool,
}

impl MetricSpec {
    /// A metric reported as-is.
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A metric reported as a per-minute change.
    pub fn diff(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diff: true,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn per_second(mut self) -> Self {
        self.per_second = true;
        self
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }
}

/// A named group of metrics sharing a label and a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec {
    /// May contain wildcards, e.g. `throughput.#` for one graph per device.
    pub name: String,
    pub label: Option<String>,
    pub unit: Unit,
    pub metrics: Vec<MetricSpec>,
}

impl GraphSpec {
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            label: None,
            unit,
            metrics: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn metric(mut self, metric: MetricSpec) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Counter name a metric of this graph is looked up under.
    pub fn lookup_name(&self, metric: &MetricSpec) -> String {
        if self.name.is_empty() {
            metric.name.clone()
        } else {
            format!("{}.{}", self.name, metric.name)
        }
    }
}

/// Whether a name contains wildcard tokens.
pub fn has_wildcard(name: &str) -> bool {
    name.contains(['*', '#'])
}

/// Graphs reported for block devices. Labels are derived from the metric
/// key prefix (`disk` → "Disk Throughput").
pub fn disk_graphs(prefix: &str) -> Vec<GraphSpec> {
    let label_prefix = title(prefix);
    vec![
        GraphSpec::new("throughput.#", Unit::BytesPerSecond)
            .with_label(format!("{} Throughput", label_prefix))
            .metric(MetricSpec::diff("read").with_label("read").per_second())
            .metric(MetricSpec::diff("write").with_label("write").per_second()),
        GraphSpec::new("time.#", Unit::Float)
            .with_label(format!("{} Time (ms)", label_prefix))
            .metric(MetricSpec::diff("read").with_label("read"))
            .metric(MetricSpec::diff("write").with_label("write"))
            .metric(MetricSpec::diff("io").with_label("io"))
            .metric(MetricSpec::diff("ioWeighted").with_label("io weighted")),
    ]
}
