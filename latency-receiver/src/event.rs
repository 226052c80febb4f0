/// Error condition reported by the peer or the local transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Condition {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// One unit of message transfer awaiting acknowledgement and settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: u64,
    pub readable: bool,
    /// More frames of this delivery are still to come
    pub partial: bool,
    /// Settled by the sender already; no acknowledgement needed
    pub settled: bool,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn is_complete(&self) -> bool {
        self.readable && !self.partial
    }
}

/// Events raised by the transport, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Connection is ready; the receiving link can be requested
    ConnectionInit,
    /// Peer opened its end of the link
    LinkRemoteOpen,
    /// Peer closed its end of the link
    LinkRemoteClose,
    Delivery(Delivery),
    TransportError(Condition),
    /// Wake-up with no traffic, drives periodic reporting only
    Tick,
    /// Anything the receiver does not act on
    Other(&'static str),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ConnectionInit => "connection-init",
            Event::LinkRemoteOpen => "link-remote-open",
            Event::LinkRemoteClose => "link-remote-close",
            Event::Delivery(_) => "delivery",
            Event::TransportError(_) => "transport-error",
            Event::Tick => "tick",
            Event::Other(kind) => kind,
        }
    }
}
