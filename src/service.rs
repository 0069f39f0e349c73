//! The monitor service: configuration, startup, and shutdown.
//!
//! [`Monitor::start`] validates the configuration, builds the immutable
//! per-channel state, and spawns the background worker that drives the
//! directory watcher and wakes subscribers. [`Monitor::shutdown`] cancels
//! the shared stop token and joins the worker; it does not return until
//! the watcher has actually exited.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::{Broadcaster, Subscription};
use crate::data::{extract_performance, PerfSample};
use crate::source::{read_latest_log, ChannelState, STARTING_PORT};
use crate::watch::DirWatcher;

/// Resolved monitor configuration.
///
/// Built once at startup and passed into each component explicitly; no
/// component reads global state.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Directory holding one iPerf3 log per channel.
    pub log_dir: PathBuf,
    /// Number of monitored channels.
    pub channels: usize,
    /// Port of channel 0; channel `n` uses `starting_port + n`.
    pub starting_port: u16,
    /// Address the live-update endpoint binds to.
    pub bind: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("iperf3-logs"),
            channels: 1,
            starting_port: STARTING_PORT,
            bind: "0.0.0.0:8765".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from an optional file plus `PERFWATCH_*`
    /// environment variables, on top of the defaults.
    pub fn load(config_file: Option<&std::path::Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("log_dir", defaults.log_dir.display().to_string())?
            .set_default("channels", defaults.channels as i64)?
            .set_default("starting_port", defaults.starting_port as i64)?
            .set_default("bind", defaults.bind)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(Environment::with_prefix("PERFWATCH"))
            .build()?
            .try_deserialize()
            .context("invalid perfwatch configuration")
    }
}

/// The running monitor service.
///
/// Owns the background watcher task and the wake broadcaster. The set of
/// channels is fixed for the lifetime of the service.
pub struct Monitor {
    channels: Vec<ChannelState>,
    broadcaster: Broadcaster,
    stop: CancellationToken,
    watcher_task: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Validate the configuration and start watching the log directory.
    ///
    /// An inaccessible log directory or a zero channel count is a fatal
    /// startup error; nothing is spawned in that case.
    pub fn start(config: &MonitorConfig) -> Result<Self> {
        ensure!(config.channels > 0, "channel count must be at least 1");
        ensure!(
            config.channels <= (u16::MAX - config.starting_port) as usize + 1,
            "channel count {} exceeds the port range starting at {}",
            config.channels,
            config.starting_port
        );
        let meta = std::fs::metadata(&config.log_dir).with_context(|| {
            format!("log directory {} is not accessible", config.log_dir.display())
        })?;
        ensure!(
            meta.is_dir(),
            "{} is not a directory",
            config.log_dir.display()
        );

        let stop = CancellationToken::new();
        let broadcaster = Broadcaster::new(stop.clone());
        let mut watcher = DirWatcher::new(&config.log_dir, stop.clone())?;

        let channels: Vec<ChannelState> = (0..config.channels)
            .map(|index| ChannelState::new(index, config.starting_port, &config.log_dir))
            .collect();

        info!(
            "monitoring {} channel(s) under {}",
            channels.len(),
            config.log_dir.display()
        );

        let worker = broadcaster.clone();
        let handle = tokio::spawn(async move {
            while watcher.changed().await.is_some() {
                debug!(
                    "log directory changed, waking {} subscriber(s)",
                    worker.subscriber_count()
                );
                worker.notify();
            }
            debug!("change watcher stopped");
        });

        Ok(Self {
            channels,
            broadcaster,
            stop,
            watcher_task: Mutex::new(Some(handle)),
        })
    }

    /// The monitored channels, in channel order.
    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    /// Register a live subscriber.
    ///
    /// The subscription's first wake fires immediately so the new viewer
    /// fetches current data; afterwards one wake per change event.
    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    /// Latest sample per channel, in channel order.
    ///
    /// A channel whose log is missing or entirely corrupt yields an empty
    /// sample rather than an error; the viewer shows blank fields.
    pub fn samples(&self) -> Vec<PerfSample> {
        self.channels
            .iter()
            .map(|channel| match read_latest_log(&channel.log_path) {
                Ok(record) => extract_performance(&record),
                Err(e) => {
                    warn!("channel {}: {:#}", channel.index, e);
                    PerfSample::default()
                }
            })
            .collect()
    }

    /// Stop the service: end the watcher's event sequence, release every
    /// waiting subscriber, and join the watcher task.
    ///
    /// Idempotent; returns once the watcher has exited.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        if let Some(handle) = self.watcher_task.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// Token cancelled when [`Monitor::shutdown`] runs; the serving layer
    /// uses it for graceful connection teardown.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}
