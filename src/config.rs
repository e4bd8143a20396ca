//! Plugin configuration.
//!
//! `Options` is what the command line hands over, with unset values left as
//! `None`. `PluginConfig::resolve` turns it into the configuration the plugin
//! runs with; every default is decided there, once.

use std::path::{Path, PathBuf};

/// Metric key prefix used when none is given.
pub const DEFAULT_PREFIX: &str = "disk";

/// Environment variable naming the directory for plugin state files.
pub const WORKDIR_ENV: &str = "MACKEREL_PLUGIN_WORKDIR";

/// Environment variable the agent sets when it asks for graph definitions.
pub const META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";

/// Unresolved options as given on the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub include_virtual_disk: bool,
    pub metric_key_prefix: Option<String>,
    /// Snapshot file name, relative to the work directory.
    pub tempfile: Option<String>,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_virtual_disk: false,
            metric_key_prefix: None,
            tempfile: None,
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
        }
    }
}

/// Fully resolved plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub include_virtual_disk: bool,
    /// Root of every emitted metric key.
    pub prefix: String,
    /// Where the previous run's counters are kept.
    pub snapshot_path: PathBuf,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
}

impl PluginConfig {
    /// Resolves defaults. Empty strings count as unset.
    pub fn resolve(options: Options, workdir: &Path) -> Self {
        let prefix = non_empty(options.metric_key_prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let tempfile = non_empty(options.tempfile)
            .unwrap_or_else(|| format!("mackerel-plugin-{}", prefix));

        Self {
            include_virtual_disk: options.include_virtual_disk,
            snapshot_path: workdir.join(tempfile),
            prefix,
            proc_path: options.proc_path,
            sys_path: options.sys_path,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Directory for plugin state: `$MACKEREL_PLUGIN_WORKDIR`, or the system
/// temporary directory.
pub fn plugin_workdir() -> PathBuf {
    match std::env::var_os(WORKDIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Whether the agent asked for graph definitions instead of values.
pub fn definitions_requested() -> bool {
    std::env::var_os(META_ENV).is_some_and(|v| !v.is_empty())
}
