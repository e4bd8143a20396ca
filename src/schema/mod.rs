//! Graph schema: what to report and how to graph it.
//!
//! Graph and metric names may contain `*`/`#` wildcards that are matched
//! against the counters discovered at run time, e.g. `throughput.#` expands
//! to one graph per block device.

pub mod expand;
pub mod matcher;
pub mod model;

pub use expand::{CompiledSchema, ResolvedMetric, expand};
pub use matcher::WildcardMatcher;
pub use model::{GraphSpec, MetricSpec, Unit, disk_graphs, has_wildcard};
