//! CLI argument parsing for evict-reload

use crate::config::{
    ProbeConfig, DEFAULT_CYCLES_PER_US, DEFAULT_DEBOUNCE_LOOPS, DEFAULT_THRESHOLD_CYCLES,
};
use crate::report::OutputFormat;
use crate::target::parse_hex_offset;
use clap::Parser;
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "evict-reload")]
#[command(version)]
#[command(about = "Evict+Reload cache-timing probe for one byte of a shared file mapping", long_about = None)]
pub struct Cli {
    /// File to map (shared library, binary, ...)
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Hexadecimal byte offset inside FILE (unparseable input means 0)
    #[arg(value_name = "OFFSET", allow_negative_numbers = true)]
    pub offset: OsString,

    /// Reload latency in cycles below which a measurement is a hit
    #[arg(long = "threshold", value_name = "CYCLES", default_value_t = DEFAULT_THRESHOLD_CYCLES)]
    pub threshold: u64,

    /// Consecutive misses that must be exceeded before a hit is reported
    #[arg(long = "debounce", value_name = "LOOPS", default_value_t = DEFAULT_DEBOUNCE_LOOPS)]
    pub debounce: u64,

    /// Cycles per microsecond for the elapsed-time column
    #[arg(
        long = "cycles-per-us",
        value_name = "N",
        default_value_t = DEFAULT_CYCLES_PER_US,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cycles_per_us: u64,

    /// Output format for hit reports
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Pin the probe to this logical CPU
    #[arg(long = "cpu", value_name = "CPU")]
    pub cpu: Option<usize>,

    /// Stop after this many iterations instead of running until killed
    #[arg(short = 'n', long = "iterations", value_name = "N")]
    pub iterations: Option<u64>,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Calibration assembled from the flags
    /// Byte offset of the monitored line, parsed from the raw argument bytes
    pub fn target_offset(&self) -> u64 {
        parse_hex_offset(self.offset.as_bytes())
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new()
            .with_threshold_cycles(self.threshold)
            .with_debounce_loops(self.debounce)
            .with_cycles_per_us(self.cycles_per_us)
            .with_iterations(self.iterations)
    }
}
