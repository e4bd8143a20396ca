//! Expansion of graph definitions against the counters of one run.

use tracing::trace;

use super::matcher::WildcardMatcher;
use super::model::{GraphSpec, has_wildcard};
use crate::storage::Counters;

/// A metric definition bound to one concrete counter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMetric {
    /// Counter name; also the output key below the root prefix.
    pub key: String,
    pub diff: bool,
    pub per_second: bool,
    pub scale: Option<f64>,
}

impl ResolvedMetric {
    /// Applies the scale factor. Must run after the diff step.
    pub fn apply_scale(&self, value: f64) -> f64 {
        match self.scale {
            Some(scale) => value * scale,
            None => value,
        }
    }
}

#[derive(Debug, Clone)]
enum Selector {
    Exact(String),
    Wildcard(WildcardMatcher),
}

#[derive(Debug, Clone)]
struct CompiledMetric {
    selector: Selector,
    diff: bool,
    per_second: bool,
    scale: Option<f64>,
}

impl CompiledMetric {
    fn resolved(&self, key: &str) -> ResolvedMetric {
        ResolvedMetric {
            key: key.to_string(),
            diff: self.diff,
            per_second: self.per_second,
            scale: self.scale,
        }
    }
}

/// Graph definitions with wildcard names compiled into matchers.
///
/// Compile once per run, then [`resolve`](Self::resolve) against the
/// counters just collected.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    metrics: Vec<CompiledMetric>,
}

impl CompiledSchema {
    pub fn compile(graphs: &[GraphSpec]) -> Result<Self, regex::Error> {
        let mut metrics = Vec::new();
        for graph in graphs {
            for metric in &graph.metrics {
                let name = graph.lookup_name(metric);
                let selector = if has_wildcard(&name) {
                    Selector::Wildcard(WildcardMatcher::compile(&name)?)
                } else {
                    Selector::Exact(name)
                };
                metrics.push(CompiledMetric {
                    selector,
                    diff: metric.diff,
                    per_second: metric.per_second,
                    scale: metric.scale,
                });
            }
        }
        Ok(Self { metrics })
    }

    /// Binds every definition to the counters present in this run.
    ///
    /// Definitions are resolved in declaration order; wildcard matches come
    /// out in ascending key order. Names with no matching counter are
    /// dropped.
    pub fn resolve(&self, counters: &Counters) -> Vec<ResolvedMetric> {
        let mut resolved = Vec::new();
        for metric in &self.metrics {
            match &metric.selector {
                Selector::Exact(name) => {
                    if counters.contains(name) {
                        resolved.push(metric.resolved(name));
                    } else {
                        trace!(metric = %name, "metric not present");
                    }
                }
                Selector::Wildcard(matcher) => {
                    resolved.extend(
                        counters
                            .keys()
                            .filter(|key| matcher.is_match(key))
                            .map(|key| metric.resolved(key)),
                    );
                }
            }
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Compiles and resolves in one step.
pub fn expand(graphs: &[GraphSpec], counters: &Counters) -> Result<Vec<ResolvedMetric>, regex::Error> {
    Ok(CompiledSchema::compile(graphs)?.resolve(counters))
}
