//! Fatal startup errors and their process exit codes

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the probe before the loop starts
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("{0}")]
    Usage(String),

    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot map {}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("offset 0x{offset:x} lies outside the {mapped} byte mapping of {}", path.display())]
    OffsetOutOfRange {
        path: PathBuf,
        offset: u64,
        mapped: usize,
    },
}

impl BootstrapError {
    /// Process exit code for this failure
    ///
    /// 1 = usage, 2 = file unusable, 3 = mapping failed or target unmappable
    pub fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::Usage(_) => 1,
            BootstrapError::Open { .. } => 2,
            BootstrapError::Map { .. } | BootstrapError::OffsetOutOfRange { .. } => 3,
        }
    }
}

/// Result type for bootstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;
