//! Block device enumeration from `/sys/block`.
//!
//! Every whole-disk device shows up in `/sys/block` as a symlink into the
//! device tree. Virtual devices (loop, ram, device-mapper, ...) live under
//! `devices/virtual/block`; everything else is backed by hardware.

use std::path::Path;

use tracing::trace;

use super::parser::DeviceFilter;
use crate::collector::procfs::CollectError;
use crate::collector::traits::FileSystem;

const VIRTUAL_BLOCK_PREFIX: &str = "../devices/virtual/block/";

/// Builds the device filter from the entries of `sys_block`.
///
/// Each entry starts out excluded and is only marked physical when it is a
/// symlink that does not point into the virtual block tree. Partitions are
/// not listed in `/sys/block`, so they stay absent from the filter and are
/// therefore included by the parser.
pub fn collect_block_devices<F: FileSystem>(
    fs: &F,
    sys_block: &Path,
) -> Result<DeviceFilter, CollectError> {
    let mut filter = DeviceFilter::default();

    for entry in fs.read_dir(sys_block)? {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let physical = match fs.symlink_target(&entry)? {
            Some(target) => !target.to_string_lossy().starts_with(VIRTUAL_BLOCK_PREFIX),
            None => false,
        };
        trace!(device = name, physical, "block device");
        filter.insert(name, physical);
    }

    Ok(filter)
}
