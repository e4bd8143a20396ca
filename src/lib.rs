//! rpdisk - block device I/O rate collector library.
//!
//! Reads cumulative counters from `/proc/diskstats`, turns them into rates
//! by comparing with the snapshot kept from the previous run, and reports
//! them as `key\tvalue\ttimestamp` lines.
//!
//! - `collector`: `/sys/block` enumeration and `/proc/diskstats` parsing
//! - `storage`: counter snapshot model and its single-file store
//! - `rates`: per-second / per-minute rate computation
//! - `schema`: graph definitions and wildcard expansion
//! - `fmt`: value lines and the graph definitions document
//! - `config`: option resolution
//! - `plugin`: one complete run

pub mod collector;
pub mod config;
pub mod fmt;
pub mod plugin;
pub mod rates;
pub mod schema;
pub mod storage;

pub use plugin::{DiskPlugin, PluginError, RunSummary};
