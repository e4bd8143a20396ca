//! Parser for `/proc/diskstats`.
//!
//! A pure function over the file content, designed to be easily testable
//! with string inputs.

use std::collections::HashMap;

use crate::storage::Counters;

/// Linux reports sector counts in fixed 512-byte units regardless of the
/// device's physical sector size (Documentation/block/stat.txt).
pub const SECTOR_SIZE: f64 = 512.0;

/// Minimum number of columns carried by a `/proc/diskstats` line.
const MIN_FIELDS: usize = 14;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The line does not carry all the columns we read.
    MissingFields {
        line: usize,
        device: Option<String>,
        found: usize,
    },
    /// A counter column is not a finite non-negative number.
    InvalidField {
        device: String,
        field: &'static str,
        value: String,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingFields {
                line,
                device: Some(device),
                found,
            } => write!(
                f,
                "line {} ({}): expected {}+ fields, got {}",
                line, device, MIN_FIELDS, found
            ),
            ParseError::MissingFields {
                line,
                device: None,
                found,
            } => write!(
                f,
                "line {}: expected {}+ fields, got {}",
                line, MIN_FIELDS, found
            ),
            ParseError::InvalidField {
                device,
                field,
                value,
            } => write!(f, "failed to parse {} of {}: {:?}", field, device, value),
        }
    }
}

impl std::error::Error for ParseError {}

/// Which devices to read, keyed by the raw kernel device name.
///
/// The filter is opt-out: a device mapped to `false` is skipped, every other
/// device (including ones the filter has never heard of) is read. An empty
/// filter therefore includes everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFilter {
    devices: HashMap<String, bool>,
}

impl DeviceFilter {
    /// Filter that includes every device.
    pub fn include_all() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device: impl Into<String>, physical: bool) {
        self.devices.insert(device.into(), physical);
    }

    /// Whether the device was enumerated, and if so whether it is physical.
    pub fn lookup(&self, device: &str) -> Option<bool> {
        self.devices.get(device).copied()
    }

    pub fn includes(&self, device: &str) -> bool {
        match self.lookup(device) {
            Some(physical) => physical,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<(String, bool)> for DeviceFilter {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

/// Strips every character that cannot appear in a metric name segment.
pub fn sanitize_device_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Parses `/proc/diskstats` content into flat counters.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged
/// w_sectors w_time io_pending io_time w_io_time [discards ...]
///
/// Six counters are produced per included device:
/// `throughput.<dev>.{read,write}` (bytes) and
/// `time.<dev>.{read,write,io,ioWeighted}` (ms).
pub fn parse_diskstats(content: &str, filter: &DeviceFilter) -> Result<Counters, ParseError> {
    let mut counters = Counters::new();

    for (idx, line) in content.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < MIN_FIELDS {
            return Err(ParseError::MissingFields {
                line: idx + 1,
                device: parts.get(2).map(|s| s.to_string()),
                found: parts.len(),
            });
        }

        let device = parts[2];
        if !filter.includes(device) {
            continue;
        }
        let name = sanitize_device_name(device);

        let get_val = |idx: usize, field: &'static str| -> Result<f64, ParseError> {
            let raw = parts[idx];
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(ParseError::InvalidField {
                    device: name.clone(),
                    field,
                    value: raw.to_string(),
                }),
            }
        };

        let read_sectors = get_val(5, "sectors read")?;
        let read_time = get_val(6, "time spent reading")?;
        let write_sectors = get_val(9, "sectors written")?;
        let write_time = get_val(10, "time spent writing")?;
        let io_time = get_val(12, "time spent doing I/Os")?;
        let io_weighted_time = get_val(13, "weighted time spent doing I/Os")?;

        counters.insert(
            format!("throughput.{}.read", name),
            read_sectors * SECTOR_SIZE,
        );
        counters.insert(
            format!("throughput.{}.write", name),
            write_sectors * SECTOR_SIZE,
        );
        counters.insert(format!("time.{}.read", name), read_time);
        counters.insert(format!("time.{}.write", name), write_time);
        counters.insert(format!("time.{}.io", name), io_time);
        counters.insert(format!("time.{}.ioWeighted", name), io_weighted_time);
    }

    Ok(counters)
}
