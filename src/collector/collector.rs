//! Disk counter collector.
//!
//! The `Collector` struct ties the `/sys/block` enumeration and the
//! `/proc/diskstats` parser to a filesystem and produces one
//! `CounterSnapshot` per call.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::collector::procfs::{
    CollectError, DeviceFilter, collect_block_devices, parse_diskstats,
};
use crate::collector::traits::FileSystem;
use crate::storage::CounterSnapshot;

/// Timing information for each collector phase.
///
/// Used for debugging.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total snapshot collection time.
    pub total: Duration,
    /// Time to enumerate `/sys/block`.
    pub devices: Duration,
    /// Time to read and parse `/proc/diskstats`.
    pub diskstats: Duration,
}

/// Reads block device counters from `/proc` and `/sys`.
pub struct Collector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    sys_path: PathBuf,
    include_virtual: bool,
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem> Collector<F> {
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
            include_virtual: false,
            last_timing: None,
        }
    }

    /// Also report virtual devices (loop, ram, dm-*, ...).
    pub fn with_virtual_devices(mut self, include: bool) -> Self {
        self.include_virtual = include;
        self
    }

    /// Builds the device filter. With virtual devices included there is
    /// nothing to filter and `/sys/block` is not read at all.
    pub fn device_filter(&self) -> Result<DeviceFilter, CollectError> {
        if self.include_virtual {
            return Ok(DeviceFilter::include_all());
        }
        collect_block_devices(&self.fs, &self.sys_path.join("block"))
    }

    /// Collects all counters, stamped with `captured_at` (Unix seconds).
    pub fn collect_snapshot(&mut self, captured_at: i64) -> Result<CounterSnapshot, CollectError> {
        let start = Instant::now();
        let mut timing = CollectorTiming::default();

        let filter = self.device_filter()?;
        timing.devices = start.elapsed();

        let t = Instant::now();
        let content = self
            .fs
            .read_to_string(&self.proc_path.join("diskstats"))?;
        let counters = parse_diskstats(&content, &filter)?;
        timing.diskstats = t.elapsed();

        timing.total = start.elapsed();
        debug!(
            devices = filter.len(),
            counters = counters.len(),
            devices_us = timing.devices.as_micros() as u64,
            diskstats_us = timing.diskstats.as_micros() as u64,
            total_us = timing.total.as_micros() as u64,
            "collected disk counters"
        );
        self.last_timing = Some(timing);

        Ok(CounterSnapshot::new(captured_at, counters))
    }

    /// Timing of the last successful `collect_snapshot` call.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }
}
