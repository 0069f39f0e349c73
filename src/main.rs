use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use perfwatch::{Monitor, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "perfwatch")]
#[command(about = "Live monitor for iPerf3 JSON throughput logs")]
struct Args {
    /// Directory holding one iPerf3 log per channel (port-<port>.json)
    #[arg(short, long)]
    log_dir: Option<PathBuf>,

    /// Number of channels to monitor
    #[arg(short, long)]
    channels: Option<usize>,

    /// Port of channel 0 (channel n logs to port-<start+n>.json)
    #[arg(long)]
    starting_port: Option<u16>,

    /// Address for the live-update WebSocket endpoint
    #[arg(short, long)]
    bind: Option<String>,

    /// Optional configuration file (overridden by the flags above)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the latest sample per channel as JSON and exit
    #[arg(long)]
    dump: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(channels) = args.channels {
        config.channels = channels;
    }
    if let Some(starting_port) = args.starting_port {
        config.starting_port = starting_port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let monitor = Arc::new(Monitor::start(&config)?);

    if args.dump {
        let samples = monitor.samples();
        println!("{}", serde_json::to_string_pretty(&samples)?);
        monitor.shutdown().await;
        return Ok(());
    }

    // Serve until interrupted; ctrl-c triggers the joinable shutdown path.
    // A serve failure (bind error, fatal transport error) must surface
    // right away, not wait for an interrupt.
    let mut server = tokio::spawn(perfwatch::ws::serve(config.bind.clone(), monitor.clone()));

    tokio::select! {
        result = &mut server => {
            monitor.shutdown().await;
            return result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    monitor.shutdown().await;
    server.await??;

    Ok(())
}
