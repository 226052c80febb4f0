use clap::{ArgAction, Parser};
use std::net::{SocketAddr, ToSocketAddrs};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format::OutputFormat;
use crate::session::MessageLimit;

const DEFAULT_PORT: u16 = 5672;

#[derive(Parser, Debug, Clone)]
#[command(name = "latency-receiver")]
#[command(about = "Receive messages on one link, tracking loss, duplication and end-to-end latency")]
pub struct Args {
    /// The host address
    #[arg(short = 'a', long = "address", default_value = "localhost:5672")]
    pub address: String,

    /// Number of messages to receive (-1 = forever)
    #[arg(short = 'c', long = "count", default_value_t = 1, allow_negative_numbers = true)]
    pub count: i64,

    /// Topic address
    #[arg(short = 't', long = "target", default_value = "topic")]
    pub target: String,

    /// Display interval in seconds (0 = final report only)
    #[arg(short = 'i', long = "interval", default_value_t = 0)]
    pub interval: u32,

    /// Pre-fetch (credit) window size
    #[arg(short = 'p', long = "prefetch", default_value_t = 100, allow_negative_numbers = true)]
    pub prefetch: i64,

    /// Expected first sequence number
    #[arg(short = 'S', long = "first-sequence", default_value_t = 0)]
    pub first_sequence: u64,

    /// Enable latency measurement
    #[arg(short = 'l', long = "latency")]
    pub latency: bool,

    /// Output in CSV format
    #[arg(short = 'u', long = "csv")]
    pub csv: bool,

    /// Increase debug verbosity
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Validated receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub address: String,
    pub message_limit: MessageLimit,
    pub target: String,
    pub interval_secs: u32,
    pub credit_window: u32,
    pub first_sequence: u64,
    pub latency: bool,
    pub output: OutputFormat,
    pub verbosity: u8,
    pub container_id: String,
}

impl TryFrom<Args> for ReceiverConfig {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        if args.prefetch <= 0 {
            return Err(Error::Config("pre-fetch must be > zero".to_string()));
        }
        let credit_window = u32::try_from(args.prefetch)
            .map_err(|_| Error::Config(format!("pre-fetch {} is too large", args.prefetch)))?;

        if args.interval > 0 && !args.latency {
            return Err(Error::Config(
                "must enable latency if display enabled".to_string(),
            ));
        }
        if credit_window < 2 {
            warn!(
                "Pre-fetch of {} is never replenished, the link stalls after {} message(s)",
                credit_window, credit_window
            );
        }

        Ok(Self {
            address: args.address,
            message_limit: MessageLimit::from_count(args.count),
            target: args.target,
            interval_secs: args.interval,
            credit_window,
            first_sequence: args.first_sequence,
            latency: args.latency,
            output: if args.csv { OutputFormat::Csv } else { OutputFormat::Table },
            verbosity: args.verbose,
            container_id: container_id(),
        })
    }
}

impl ReceiverConfig {
    /// A window below 2 has no half-window refill point
    pub fn replenishes_credit(&self) -> bool {
        self.credit_window >= 2
    }

    /// Per-message latency rows are printed at verbosity 1 and above
    pub fn trace_enabled(&self) -> bool {
        self.latency && self.verbosity > 0
    }

    pub fn resolve_peer(&self) -> Result<SocketAddr> {
        resolve_address(&self.address)
    }

    pub fn log_summary(&self) {
        debug!("Configuration:");
        debug!(" Bus: {}", self.address);
        match self.message_limit {
            MessageLimit::Unlimited => debug!(" Count: unlimited"),
            MessageLimit::Remaining(count) => debug!(" Count: {}", count),
        }
        debug!(" Topic: {}", self.target);
        debug!(" Display Intrv: {}", self.interval_secs);
        debug!(
            " Latency: {}",
            if self.latency { "enabled" } else { "disabled" }
        );
        debug!(" Pre-fetch: {}", self.credit_window);
        debug!(" First sequence: {}", self.first_sequence);
        debug!(" Container: {}", self.container_id);
    }
}

/// Unique per process so several receivers can attach to one peer
fn container_id() -> String {
    let host = hostname(
        std::env::var("HOSTNAME").ok(),
        std::fs::read_to_string("/etc/hostname").ok(),
    );
    format!(
        "receiver-container-{}-{}-{}",
        host,
        std::process::id(),
        rand::random::<u32>()
    )
}

/// First non-empty of the environment and the system host name file.
fn hostname(env: Option<String>, file: Option<String>) -> String {
    [env, file]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Accepts `host:port`, bare `host`, and an optional `amqp://` prefix.
pub fn resolve_address(address: &str) -> Result<SocketAddr> {
    let invalid = |reason: &str| Error::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let authority = address
        .strip_prefix("amqp://")
        .unwrap_or(address)
        .split('/')
        .next()
        .unwrap_or_default();
    if authority.is_empty() {
        return Err(invalid("empty host"));
    }

    let has_port = match authority.rsplit_once(':') {
        Some((host, _)) if authority.starts_with('[') => host.ends_with(']'),
        Some((host, _)) => !host.contains(':'),
        None => false,
    };
    let with_port = if has_port {
        authority.to_string()
    } else {
        format!("{}:{}", authority, DEFAULT_PORT)
    };

    with_port
        .to_socket_addrs()
        .map_err(|e| invalid(&e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses resolved"))
}
