//! Readers for the Linux `/proc` and `/sys` filesystems.
//!
//! This module provides the `/proc/diskstats` parser and the `/sys/block`
//! device enumeration used to decide which devices are reported.

pub mod parser;
pub mod sysblock;

pub use parser::{DeviceFilter, ParseError, parse_diskstats};
pub use sysblock::collect_block_devices;

/// Errors raised while reading counters from the system.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading `/proc` or `/sys`.
    Io(std::io::Error),
    /// Malformed counter table.
    Parse(ParseError),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            CollectError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e)
    }
}
