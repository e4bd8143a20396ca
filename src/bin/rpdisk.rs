//! rpdisk - block device I/O metrics plugin.
//!
//! Prints disk throughput and I/O time rates to stdout, one metric per line.
//! With `MACKEREL_AGENT_PLUGIN_META` set, prints graph definitions instead.
//! Meant to be invoked periodically by an agent; each invocation is one run.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use rpdisk::DiskPlugin;
use rpdisk::collector::RealFs;
use rpdisk::config::{self, Options, PluginConfig};

/// Block device I/O metrics plugin.
#[derive(Parser)]
#[command(name = "rpdisk", about = "Block device I/O metrics plugin", version)]
struct Args {
    /// Include virtual disks (loop, ram, device-mapper, ...).
    #[arg(long)]
    include_virtual_disk: bool,

    /// Metric key prefix.
    #[arg(long, value_name = "PREFIX")]
    metric_key_prefix: Option<String>,

    /// Snapshot file name, relative to $MACKEREL_PLUGIN_WORKDIR.
    #[arg(long, value_name = "NAME")]
    tempfile: Option<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl From<Args> for Options {
    fn from(args: Args) -> Self {
        Options {
            include_virtual_disk: args.include_virtual_disk,
            metric_key_prefix: args.metric_key_prefix,
            tempfile: args.tempfile,
            proc_path: args.proc_path,
            sys_path: args.sys_path,
        }
    }
}

/// Initializes the tracing subscriber on stderr; stdout carries the metrics.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // Library and binary share the `rpdisk` target.
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("rpdisk={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = PluginConfig::resolve(args.into(), &config::plugin_workdir());
    let mut plugin = match DiskPlugin::new(&config, RealFs::new()) {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = if config::definitions_requested() {
        plugin.output_definitions(&mut out)
    } else {
        plugin
            .output_values(&mut out, Utc::now().timestamp())
            .map(|_| ())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
