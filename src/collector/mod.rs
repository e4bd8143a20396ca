//! Block device counter collection for Linux.
//!
//! This module reads `/sys/block` and `/proc/diskstats` through the
//! `FileSystem` trait, so the collector can be exercised against an
//! in-memory `MockFs` on any platform.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Collector                   │
//! │  ┌──────────────────┐   ┌──────────────────┐  │
//! │  │ sysblock         │   │ parser           │  │
//! │  │ - /sys/block/*   │──▶│ - /proc/diskstats│  │
//! │  │ (DeviceFilter)   │   │ (Counters)       │  │
//! │  └────────┬─────────┘   └────────┬─────────┘  │
//! │           └────────────┬─────────┘            │
//! │                 ┌──────▼──────┐               │
//! │                 │  FileSystem │ (trait)       │
//! │                 └──────┬──────┘               │
//! └────────────────────────┼──────────────────────┘
//!                  ┌───────┴───────┐
//!           ┌──────▼──────┐ ┌──────▼──────┐
//!           │   RealFs    │ │   MockFs    │
//!           └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use rpdisk::collector::{Collector, MockFs};
//!
//! let fs = MockFs::virtio_guest();
//! let mut collector = Collector::new(fs, "/proc", "/sys");
//! let snapshot = collector.collect_snapshot(1_700_000_000).unwrap();
//! assert_eq!(snapshot.counters.len(), 12);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use collector::{Collector, CollectorTiming};
pub use mock::MockFs;
pub use procfs::{CollectError, DeviceFilter, ParseError};
pub use traits::{FileSystem, RealFs};
