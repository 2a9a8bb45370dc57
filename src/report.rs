//! Console rendering of reported cache hits

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format for hit reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width human-readable line (default)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// A debounced cache hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitReport {
    /// Reload latency in cycles
    pub latency: u64,
    /// Consecutive misses seen before this hit
    pub idle: u64,
    /// Time since the run baseline, in microseconds
    pub elapsed_us: u64,
    /// Key state label at the moment of the hit (before it toggles)
    pub keystate: u8,
}

impl HitReport {
    /// Fixed-width text line
    ///
    /// # Example
    /// ```
    /// use evict_reload::report::HitReport;
    /// let r = HitReport { latency: 42, idle: 1500, elapsed_us: 17, keystate: 1 };
    /// assert_eq!(
    ///     r.to_text(),
    ///     "CACHE HIT - Δ = 42   cycles | idle = 1500  loops | t =     17 µs | key = 1"
    /// );
    /// ```
    pub fn to_text(&self) -> String {
        format!(
            "CACHE HIT - Δ = {:<4} cycles | idle = {:<5} loops | t = {:>6} µs | key = {}",
            self.latency, self.idle, self.elapsed_us, self.keystate
        )
    }
}

/// Writes hit reports to any sink in the chosen format
pub struct ReportWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Emit one report line and flush so it shows up while the probe keeps spinning
    pub fn write(&mut self, report: &HitReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", report.to_text())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, report)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
