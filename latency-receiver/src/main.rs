use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use latency_receiver::clock::{Clock, SystemClock};
use latency_receiver::trace::LatencyTrace;
use latency_receiver::transport::DatagramTransport;
use latency_receiver::{Args, Dispatcher, ReceiverConfig, Reporter, StopFlag};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the reports, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_receiver(config: ReceiverConfig, peer: SocketAddr, stop: StopFlag) -> Result<()> {
    let transport = DatagramTransport::connect(peer, config.container_id.clone())
        .with_context(|| format!("cannot create connection to {}", peer))?;

    let clock = SystemClock;
    let mut reporter = Reporter::new(config.output, config.interval_secs, clock.now_ms());
    let mut dispatcher = Dispatcher::new(transport, clock, &config);
    if config.trace_enabled() {
        let out: Box<dyn Write> = Box::new(io::stdout());
        dispatcher = dispatcher.with_trace(LatencyTrace::new(config.output, out));
    }

    let mut out = io::stdout();
    dispatcher.run(&stop, &mut reporter, &mut out)?;

    let snapshot = dispatcher.snapshot();
    info!(
        "Receiver finished: {} received, {} dropped, {} duplicate",
        snapshot.received, snapshot.dropped, snapshot.duplicates
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ReceiverConfig::try_from(args)?;
    config.log_summary();
    let peer = config.resolve_peer()?;

    info!("Starting receiver for '{}' on {}", config.target, peer);

    // Setup graceful shutdown
    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, stopping after the current event");
                    stop.stop();
                }
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
        });
    }

    tokio::task::spawn_blocking(move || run_receiver(config, peer, stop))
        .await
        .context("receiver loop panicked")??;

    Ok(())
}
