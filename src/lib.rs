//! # perfwatch
//!
//! A live monitor for iPerf3 throughput logs.
//!
//! External iPerf3 server processes (one per monitored channel) append a
//! JSON result document to a per-channel log file after every benchmark
//! run. This crate recovers those documents from the jointly-invalid log,
//! extracts the throughput figures a viewer displays, watches the log
//! directory for new runs, and fans out "new data" wakes to any number of
//! live-update WebSocket subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Monitor                              │
//! │  ┌─────────┐    ┌───────────┐    ┌──────────────────────────┐  │
//! │  │  watch  │───▶│ broadcast │───▶│ ws (one task/subscriber) │  │
//! │  │ (notify)│    │ (fan-out) │    │      "new data"          │  │
//! │  └─────────┘    └───────────┘    └──────────────────────────┘  │
//! │       ▲                                                        │
//! │  log directory          re-fetch path (per subscriber):        │
//! │  port-5201.json ──▶ source::read_log ──▶ data::extract ──▶ …   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: per-channel log naming, tolerant reading, and
//!   splitting of concatenated JSON run results
//! - **[`data`]**: reduction of one run result to a [`PerfSample`]
//! - **[`watch`]**: filesystem change events for the log directory
//! - **[`broadcast`]**: exactly-once wake fan-out to live subscribers
//! - **[`service`]**: configuration, startup validation, and joinable
//!   shutdown
//! - **[`ws`]**: the WebSocket live-update endpoint
//!
//! ## Usage
//!
//! ```no_run
//! use perfwatch::{Monitor, MonitorConfig};
//!
//! # tokio_test::block_on(async {
//! let config = MonitorConfig {
//!     log_dir: "/home/pi/iperf3-logs".into(),
//!     channels: 4,
//!     ..MonitorConfig::default()
//! };
//! let monitor = Monitor::start(&config).unwrap();
//!
//! let mut sub = monitor.subscribe();
//! sub.changed().await; // fires immediately: fetch current data
//! let samples = monitor.samples();
//!
//! monitor.shutdown().await;
//! # });
//! ```

pub mod broadcast;
pub mod data;
pub mod service;
pub mod source;
pub mod watch;
pub mod ws;

// Re-export main types for convenience
pub use broadcast::{Broadcaster, Subscription, Wake};
pub use data::{extract_performance, PerfSample};
pub use service::{Monitor, MonitorConfig};
pub use source::{read_latest_log, read_log, ChannelState, STARTING_PORT};
pub use watch::DirWatcher;
