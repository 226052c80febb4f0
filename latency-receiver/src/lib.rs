//! Receiver-side statistics and flow control for a single message link.
//!
//! Deliveries flow from a [`transport::Transport`] through the
//! [`dispatcher::Dispatcher`], which keeps the credit window topped up,
//! classifies sequence ids as in-order, gap or duplicate, and histograms
//! end-to-end latency. The [`report::Reporter`] renders snapshots of the
//! accumulated statistics.

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod flow;
pub mod format;
pub mod histogram;
pub mod latency;
pub mod message;
pub mod report;
pub mod sequence;
pub mod session;
pub mod shutdown;
pub mod trace;
pub mod transport;

pub use config::{Args, ReceiverConfig};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use report::{Reporter, StatsSnapshot};
pub use shutdown::StopFlag;
