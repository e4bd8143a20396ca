//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc/diskstats` and `/sys/block`
//! states of a small virtio guest.

use super::filesystem::MockFs;

/// `/proc/diskstats` of a guest with two loop devices and one virtio disk.
pub const GUEST_DISKSTATS: &str = "   7       0 loop0 12330 0 26704 960 0 0 0 0 0 68 720
   7       1 loop1 278 0 2590 48 0 0 0 0 0 8 28
 253       0 vda 568978 150 13872551 9214932 702789 28973 27693174 39969124 0 483933 49191357
 253       1 vda1 568892 150 13868407 9214909 702123 28973 27693166 39969007 0 483777 49187590
";

/// Extra line for a second virtio disk.
pub const VDB_DISKSTATS_LINE: &str =
    " 253      16 vdb 1357367 2080 34805026 10439061 1561480 21147 57531600 35716520 0 464104 46206065\n";

impl MockFs {
    /// Creates a virtio guest: `vda` is physical, `loop0`/`loop1` are
    /// virtual, `vda1` is a partition and has no `/sys/block` entry.
    pub fn virtio_guest() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/diskstats", GUEST_DISKSTATS);
        fs.add_block_device("/sys", "loop0", false);
        fs.add_block_device("/sys", "loop1", false);
        fs.add_block_device("/sys", "vda", true);
        fs
    }

    /// Replaces `/proc/diskstats` content, keeping `/sys/block` untouched.
    pub fn set_diskstats(&mut self, content: impl Into<String>) {
        self.add_file("/proc/diskstats", content);
    }
}
