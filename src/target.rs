//! Target bootstrap: open the file, map it shared read-only, locate the probed byte
//!
//! The mapping is owned by [`MonitoredTarget`], and the probe loop borrows the
//! target, so the monitored pointer can never outlive the mapping.

use crate::config::MAP_WINDOW_BYTES;
use crate::error::{BootstrapError, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse a hexadecimal byte offset the way `sscanf("%x")` does
///
/// Leading whitespace, an optional `+`/`-` sign and an optional `0x`/`0X`
/// prefix are skipped, then the longest run of hex digits is consumed. Input
/// with no digits yields 0 instead of an error. A `-` sign negates modulo
/// 2^64 and values too large for `u64` saturate; either way the offset lands
/// outside any mapping.
///
/// Takes raw bytes so non-UTF-8 arguments parse like any other garbage.
///
/// # Example
/// ```
/// use evict_reload::target::parse_hex_offset;
/// assert_eq!(parse_hex_offset("0xbba40"), 0xbba40);
/// assert_eq!(parse_hex_offset("+40"), 0x40);
/// assert_eq!(parse_hex_offset("4c40zz"), 0x4c40);
/// assert_eq!(parse_hex_offset("nope"), 0);
/// ```
pub fn parse_hex_offset(input: impl AsRef<[u8]>) -> u64 {
    let bytes = input.as_ref();
    let skip = bytes
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t'..=b'\r'))
        .unwrap_or(bytes.len());
    let mut rest = &bytes[skip..];

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };
    if let Some(tail) = rest.strip_prefix(b"0x").or_else(|| rest.strip_prefix(b"0X")) {
        rest = tail;
    }

    let mut value = 0u64;
    let mut overflow = false;
    for digit in rest.iter().map_while(|&b| char::from(b).to_digit(16)) {
        match value
            .checked_mul(16)
            .and_then(|v| v.checked_add(u64::from(digit)))
        {
            Some(v) => value = v,
            None => overflow = true,
        }
    }

    if overflow {
        u64::MAX
    } else if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// A byte inside a shared, read-only file mapping
#[derive(Debug)]
pub struct MonitoredTarget {
    path: PathBuf,
    offset: u64,
    map: Mmap,
}

impl MonitoredTarget {
    /// Open `path` read-only and map up to the first 64 MiB of it
    ///
    /// The mapping never extends past end-of-file, so the reload can never
    /// fault on a page with no backing.
    pub fn open(path: &Path, offset: u64) -> Result<Self> {
        let file = File::open(path).map_err(|source| BootstrapError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let file_len = file
            .metadata()
            .map_err(|source| BootstrapError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let map_len = usize::try_from(file_len)
            .unwrap_or(usize::MAX)
            .min(MAP_WINDOW_BYTES);

        debug!(path = %path.display(), file_len, map_len, "opened target file");

        if offset >= map_len as u64 {
            return Err(BootstrapError::OffsetOutOfRange {
                path: path.to_path_buf(),
                offset,
                mapped: map_len,
            });
        }

        // SAFETY: the mapping is read-only. Other processes may write the file
        // underneath it; the probe only ever issues volatile byte loads.
        let map = unsafe { MmapOptions::new().len(map_len).map(&file) }.map_err(|source| {
            BootstrapError::Map {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let target = Self {
            path: path.to_path_buf(),
            offset,
            map,
        };
        debug!(ptr = ?target.as_ptr(), "target mapped");
        Ok(target)
    }

    /// Pointer to the monitored byte (valid while `self` lives)
    pub fn as_ptr(&self) -> *const u8 {
        // offset < map.len() is checked in `open`
        &self.map[self.offset as usize] as *const u8
    }

    /// Byte offset of the monitored line inside the file
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes actually mapped
    pub fn mapped_len(&self) -> usize {
        self.map.len()
    }

    /// Startup line announcing what is monitored
    pub fn banner(&self) -> String {
        format!("Monitoring {} + 0x{:x}", self.path.display(), self.offset)
    }
}
