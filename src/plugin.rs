//! One collector run: collect, compare with the previous run, report, persist.
//!
//! ```text
//! /sys/block ─┐
//!             ├─▶ Counters ──▶ CompiledSchema::resolve ──▶ rate ──▶ format_line ──▶ out
//! diskstats ──┘       │                                      ▲
//!                     │            SnapshotStore::load ──────┘
//!                     └──────────▶ SnapshotStore::save
//! ```
//!
//! Only a failed collection and a failed save abort the run. Everything else
//! (no previous snapshot, corrupt snapshot, counter reset, stale window,
//! NaN) drops the affected metrics and carries on.

use std::io::{self, Write};

use tracing::{debug, info, warn};

use crate::collector::{CollectError, Collector, FileSystem};
use crate::config::PluginConfig;
use crate::fmt::{DEFINITIONS_MARKER, definitions, format_line, metric_key};
use crate::rates::rate;
use crate::schema::{CompiledSchema, GraphSpec, ResolvedMetric, disk_graphs};
use crate::storage::{CounterSnapshot, SnapshotStore, StoreError};

/// Errors that abort a run.
#[derive(Debug)]
pub enum PluginError {
    /// Counters could not be read or parsed.
    Collect(CollectError),
    /// The new snapshot could not be persisted.
    Store(StoreError),
    /// A graph definition could not be compiled.
    Schema(regex::Error),
    /// Writing to the output stream failed.
    Io(io::Error),
    /// The definitions document could not be serialized.
    Json(serde_json::Error),
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginError::Collect(e) => write!(f, "cannot collect disk counters: {}", e),
            PluginError::Store(e) => write!(f, "cannot save snapshot: {}", e),
            PluginError::Schema(e) => write!(f, "invalid graph definition: {}", e),
            PluginError::Io(e) => write!(f, "cannot write output: {}", e),
            PluginError::Json(e) => write!(f, "cannot encode graph definitions: {}", e),
        }
    }
}

impl std::error::Error for PluginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PluginError::Collect(e) => Some(e),
            PluginError::Store(e) => Some(e),
            PluginError::Schema(e) => Some(e),
            PluginError::Io(e) => Some(e),
            PluginError::Json(e) => Some(e),
        }
    }
}

impl From<CollectError> for PluginError {
    fn from(e: CollectError) -> Self {
        PluginError::Collect(e)
    }
}

impl From<StoreError> for PluginError {
    fn from(e: StoreError) -> Self {
        PluginError::Store(e)
    }
}

impl From<regex::Error> for PluginError {
    fn from(e: regex::Error) -> Self {
        PluginError::Schema(e)
    }
}

impl From<io::Error> for PluginError {
    fn from(e: io::Error) -> Self {
        PluginError::Io(e)
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        PluginError::Json(e)
    }
}

/// Outcome of one values run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines written.
    pub emitted: usize,
    /// Resolved metrics that produced no line.
    pub skipped: usize,
}

/// Block device I/O plugin.
pub struct DiskPlugin<F: FileSystem> {
    prefix: String,
    collector: Collector<F>,
    store: SnapshotStore,
    graphs: Vec<GraphSpec>,
    schema: CompiledSchema,
}

impl<F: FileSystem> DiskPlugin<F> {
    pub fn new(config: &PluginConfig, fs: F) -> Result<Self, PluginError> {
        let graphs = disk_graphs(&config.prefix);
        let schema = CompiledSchema::compile(&graphs)?;
        let collector = Collector::new(fs, &config.proc_path, &config.sys_path)
            .with_virtual_devices(config.include_virtual_disk);

        Ok(Self {
            prefix: config.prefix.clone(),
            collector,
            store: SnapshotStore::new(&config.snapshot_path),
            graphs,
            schema,
        })
    }

    /// Collects counters at `now` (Unix seconds), writes one line per
    /// reportable metric to `out` and persists the counters for the next run.
    pub fn output_values<W: Write>(
        &mut self,
        out: &mut W,
        now: i64,
    ) -> Result<RunSummary, PluginError> {
        let current = self.collector.collect_snapshot(now)?;

        let previous = match self.store.load() {
            Ok(Some(previous)) => Some(previous),
            Ok(None) => {
                info!("no previous snapshot, diff metrics start with the next run");
                None
            }
            Err(e) => {
                warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    "ignoring unreadable previous snapshot"
                );
                None
            }
        };

        let mut summary = RunSummary::default();
        for metric in self.schema.resolve(&current.counters) {
            let Some(value) = evaluate(&metric, &current, previous.as_ref()) else {
                summary.skipped += 1;
                continue;
            };

            let key = metric_key(&[self.prefix.as_str(), metric.key.as_str()]);
            match format_line(&key, value, now) {
                Ok(line) => {
                    out.write_all(line.as_bytes())?;
                    summary.emitted += 1;
                }
                Err(e) => {
                    warn!(metric = %key, error = %e, "skipping metric");
                    summary.skipped += 1;
                }
            }
        }
        out.flush()?;

        self.store.save(&current)?;

        debug!(
            emitted = summary.emitted,
            skipped = summary.skipped,
            "run finished"
        );
        Ok(summary)
    }

    /// Writes the graph definitions document.
    pub fn output_definitions<W: Write>(&self, out: &mut W) -> Result<(), PluginError> {
        let defs = definitions(&self.prefix, &self.graphs);
        writeln!(out, "{}", DEFINITIONS_MARKER)?;
        serde_json::to_writer(&mut *out, &defs)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Computes the value to report for one metric, or `None` to skip it.
fn evaluate(
    metric: &ResolvedMetric,
    current: &CounterSnapshot,
    previous: Option<&CounterSnapshot>,
) -> Option<f64> {
    let value = current.counters.get(&metric.key)?;
    if !metric.diff {
        return Some(metric.apply_scale(value));
    }

    let previous = previous?;
    let Some(last) = previous.counters.get(&metric.key) else {
        debug!(metric = %metric.key, "does not exist at last fetch");
        return None;
    };

    let elapsed = previous.elapsed_until(current.captured_at);
    match rate(value, last, elapsed, metric.per_second) {
        Ok(per_unit) => Some(metric.apply_scale(per_unit)),
        Err(e) => {
            warn!(metric = %metric.key, error = %e, "skipping metric");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;
    use crate::collector::mock::GUEST_DISKSTATS;
    use crate::config::Options;
    use crate::schema::{MetricSpec, Unit};
    use crate::storage::Counters;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const T0: i64 = 1_700_000_000;

    fn plugin(fs: MockFs, workdir: &Path) -> DiskPlugin<MockFs> {
        let config = PluginConfig::resolve(Options::default(), workdir);
        DiskPlugin::new(&config, fs).unwrap()
    }

    fn run(fs: MockFs, workdir: &Path, now: i64) -> (RunSummary, String) {
        let mut out = Vec::new();
        let summary = plugin(fs, workdir).output_values(&mut out, now).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    fn first_run() -> TempDir {
        let dir = tempdir().unwrap();
        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0);
        assert_eq!(summary, RunSummary { emitted: 0, skipped: 12 });
        assert!(output.is_empty());
        dir
    }

    fn guest_with(from: &str, to: &str) -> MockFs {
        assert!(GUEST_DISKSTATS.contains(from));
        let mut fs = MockFs::virtio_guest();
        fs.set_diskstats(GUEST_DISKSTATS.replace(from, to));
        fs
    }

    #[test]
    fn test_first_run_only_saves_snapshot() {
        let dir = first_run();
        let saved = SnapshotStore::new(dir.path().join("mackerel-plugin-disk"))
            .load()
            .unwrap()
            .unwrap();

        assert_eq!(saved.captured_at, T0);
        assert_eq!(saved.counters.len(), 12);
    }

    #[test]
    fn test_unchanged_counters_report_zero() {
        let dir = first_run();
        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0 + 60);

        assert_eq!(summary, RunSummary { emitted: 12, skipped: 0 });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "disk.throughput.vda.read\t0\t1700000060");
        assert_eq!(lines[1], "disk.throughput.vda1.read\t0\t1700000060");
        assert!(lines.iter().all(|l| l.split('\t').nth(1) == Some("0")));
    }

    #[test]
    fn test_throughput_per_second_and_time_per_minute() {
        let dir = first_run();
        // vda: +120 sectors read, +30 ms spent reading.
        let fs = guest_with("13872551 9214932", "13872671 9214962");
        let (_, output) = run(fs, dir.path(), T0 + 60);

        assert!(output.contains("disk.throughput.vda.read\t1024\t1700000060\n"));
        assert!(output.contains("disk.time.vda.read\t30\t1700000060\n"));
        assert!(output.contains("disk.throughput.vda1.read\t0\t1700000060\n"));
    }

    #[test]
    fn test_elapsed_time_comes_from_snapshot() {
        let dir = first_run();
        let fs = guest_with("13872551 9214932", "13872671 9214962");
        let (_, output) = run(fs, dir.path(), T0 + 120);

        assert!(output.contains("disk.throughput.vda.read\t512\t1700000120\n"));
        assert!(output.contains("disk.time.vda.read\t15\t1700000120\n"));
    }

    #[test]
    fn test_counter_reset_skips_only_that_metric() {
        let dir = first_run();
        let fs = guest_with("9214932", "9214000");
        let (summary, output) = run(fs, dir.path(), T0 + 60);

        assert_eq!(summary, RunSummary { emitted: 11, skipped: 1 });
        assert!(!output.contains("disk.time.vda.read\t"));
        assert!(output.contains("disk.time.vda1.read\t0\t"));
    }

    #[test]
    fn test_stale_snapshot_reports_nothing_but_is_replaced() {
        let dir = first_run();
        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0 + 601);

        assert_eq!(summary, RunSummary { emitted: 0, skipped: 12 });
        assert!(output.is_empty());

        let (summary, _) = run(MockFs::virtio_guest(), dir.path(), T0 + 661);
        assert_eq!(summary.emitted, 12);
    }

    #[test]
    fn test_parse_error_keeps_previous_snapshot() {
        let dir = first_run();
        let fs = guest_with("13872551", "garbage");

        let mut out = Vec::new();
        let err = plugin(fs, dir.path())
            .output_values(&mut out, T0 + 60)
            .unwrap_err();
        assert!(matches!(err, PluginError::Collect(CollectError::Parse(_))));
        assert!(out.is_empty());

        let saved = SnapshotStore::new(dir.path().join("mackerel-plugin-disk"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(saved.captured_at, T0);
    }

    #[test]
    fn test_corrupt_snapshot_is_ignored_and_replaced() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mackerel-plugin-disk"), "not json").unwrap();

        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0);
        assert_eq!(summary.emitted, 0);
        assert!(output.is_empty());

        let (summary, _) = run(MockFs::virtio_guest(), dir.path(), T0 + 60);
        assert_eq!(summary.emitted, 12);
    }

    #[test]
    fn test_out_of_range_snapshot_time_degrades() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mackerel-plugin-disk");
        std::fs::write(&path, r#"{"_lastTime":-1e300,"throughput.vda.read":1}"#).unwrap();

        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0);
        assert_eq!(summary, RunSummary { emitted: 0, skipped: 12 });
        assert!(output.is_empty());

        let saved = SnapshotStore::new(&path).load().unwrap().unwrap();
        assert_eq!(saved.captured_at, T0);
    }

    #[test]
    fn test_extreme_snapshot_time_is_stale() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("mackerel-plugin-disk"));
        let mut counters = Counters::new();
        counters.insert("throughput.vda.read", 1.0);
        store
            .save(&CounterSnapshot::new(i64::MIN, counters))
            .unwrap();

        let (summary, output) = run(MockFs::virtio_guest(), dir.path(), T0);
        assert_eq!(summary, RunSummary { emitted: 0, skipped: 12 });
        assert!(output.is_empty());
    }

    #[test]
    fn test_non_finite_value_is_skipped() {
        let dir = tempdir().unwrap();
        let mut plugin = plugin(MockFs::virtio_guest(), dir.path());
        plugin.graphs = vec![
            GraphSpec::new("throughput.#", Unit::Bytes)
                .metric(MetricSpec::raw("read").scaled(f64::INFINITY))
                .metric(MetricSpec::raw("write")),
        ];
        plugin.schema = CompiledSchema::compile(&plugin.graphs).unwrap();

        let mut out = Vec::new();
        let summary = plugin.output_values(&mut out, T0).unwrap();
        assert_eq!(summary, RunSummary { emitted: 2, skipped: 2 });

        let output = String::from_utf8(out).unwrap();
        assert!(!output.contains(".read\t"));
        assert!(output.contains("disk.throughput.vda.write\t14178905088\t1700000000\n"));

        let saved = SnapshotStore::new(dir.path().join("mackerel-plugin-disk"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(saved.captured_at, T0);
    }

    #[test]
    fn test_new_device_waits_for_next_run() {
        let dir = first_run();
        let mut fs = MockFs::virtio_guest();
        fs.set_diskstats(format!(
            "{}{}",
            GUEST_DISKSTATS,
            crate::collector::mock::VDB_DISKSTATS_LINE
        ));
        fs.add_block_device("/sys", "vdb", true);

        let (summary, output) = run(fs, dir.path(), T0 + 60);
        assert_eq!(summary, RunSummary { emitted: 12, skipped: 6 });
        assert!(!output.contains(".vdb."));
    }

    #[test]
    fn test_include_virtual_disk_and_custom_prefix() {
        let dir = tempdir().unwrap();
        let options = Options {
            include_virtual_disk: true,
            metric_key_prefix: Some("blk".to_string()),
            ..Options::default()
        };
        let config = PluginConfig::resolve(options, dir.path());

        let mut out = Vec::new();
        DiskPlugin::new(&config, MockFs::virtio_guest())
            .unwrap()
            .output_values(&mut out, T0)
            .unwrap();
        let summary = DiskPlugin::new(&config, MockFs::virtio_guest())
            .unwrap()
            .output_values(&mut out, T0 + 30)
            .unwrap();

        assert_eq!(summary.emitted, 24);
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("blk.throughput.loop0.read\t0\t1700000030\n"));
        assert!(dir.path().join("mackerel-plugin-blk").exists());
    }

    #[test]
    fn test_raw_and_scaled_metrics() {
        let current = CounterSnapshot::new(T0 + 60, {
            let mut c = Counters::new();
            c.insert("throughput.sda.read", 1000.0);
            c
        });
        let previous = CounterSnapshot::new(T0, {
            let mut c = Counters::new();
            c.insert("throughput.sda.read", 400.0);
            c
        });

        let raw = ResolvedMetric {
            key: "throughput.sda.read".to_string(),
            diff: false,
            per_second: false,
            scale: None,
        };
        assert_eq!(evaluate(&raw, &current, None), Some(1000.0));

        let bits = ResolvedMetric {
            diff: true,
            per_second: true,
            scale: Some(8.0),
            ..raw.clone()
        };
        // (1000 - 400) / 60 = 10 bytes/s, scaled after the rate step.
        assert_eq!(evaluate(&bits, &current, Some(&previous)), Some(80.0));
        assert_eq!(evaluate(&bits, &current, None), None);
    }

    #[test]
    fn test_output_definitions() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        plugin(MockFs::new(), dir.path())
            .output_definitions(&mut out)
            .unwrap();

        let output = String::from_utf8(out).unwrap();
        let (marker, body) = output.split_once('\n').unwrap();
        assert_eq!(marker, "# mackerel-agent-plugin");

        let json: serde_json::Value = serde_json::from_str(body.trim()).unwrap();
        assert_eq!(json["graphs"]["disk.throughput.#"]["label"], "Disk Throughput");
        assert_eq!(json["graphs"]["disk.time.#"]["label"], "Disk Time (ms)");
        assert_eq!(
            json["graphs"]["disk.time.#"]["metrics"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }
}
