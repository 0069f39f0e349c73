//! Reading iPerf3 log files.
//!
//! One log file per monitored channel, append-only, written by an external
//! iPerf3 server process. The file is re-read in full on every access; no
//! state is cached between calls, so concurrent readers are safe.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::record::{latest_record, split_records};

/// Read every benchmark run recorded in the log file, oldest first.
///
/// Malformed blocks degrade to fewer records; only an I/O failure (for
/// example a missing file) is an error.
pub fn read_log(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading iPerf3 log {}", path.display()))?;
    Ok(split_records(&content))
}

/// Read only the most recent benchmark run recorded in the log file.
///
/// Returns an empty JSON object if the final block is corrupt or the file
/// holds no block yet.
pub fn read_latest_log(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading iPerf3 log {}", path.display()))?;
    Ok(latest_record(&content))
}
