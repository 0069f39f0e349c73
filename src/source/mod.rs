//! Log sources for iPerf3 measurement data.
//!
//! Each monitored channel is one iPerf3 server instance writing an
//! append-only JSON log. This module names those logs deterministically,
//! reads them tolerantly ([`log`]), and splits their concatenated run
//! results back apart ([`record`]).

mod log;
pub mod record;

pub use log::{read_log, read_latest_log};

use std::path::{Path, PathBuf};

/// The first port iPerf3 defaults to; channel `n` listens on
/// `starting_port + n`.
pub const STARTING_PORT: u16 = 5201;

/// File name of the log for a channel listening on `port`.
pub fn log_file_name(port: u16) -> String {
    format!("port-{}.json", port)
}

/// One monitored benchmark channel.
///
/// Immutable after construction; the full set is built once at startup
/// from the configured channel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// Zero-based channel index.
    pub index: usize,
    /// Port the channel's iPerf3 server listens on.
    pub port: u16,
    /// Path of the channel's log file.
    pub log_path: PathBuf,
}

impl ChannelState {
    /// Describe the channel at `index`, logging under `log_dir`.
    pub fn new(index: usize, starting_port: u16, log_dir: &Path) -> Self {
        let port = starting_port + index as u16;
        Self {
            index,
            port,
            log_path: log_dir.join(log_file_name(port)),
        }
    }
}
