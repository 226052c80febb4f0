// Transport collaborators: the trait the dispatcher drives, plus implementations
pub mod datagram;
pub mod frame;
#[cfg(test)]
pub(crate) mod memory;

pub use datagram::DatagramTransport;

use std::time::Duration;

use crate::error::Result;
use crate::event::{Delivery, Event};
use crate::message::{DecodeError, DecodedMessage};

/// Opaque handle to an open receiving link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHandle(pub u32);

/// Capabilities the receiver consumes from the connection/session/link stack.
///
/// Credit, acknowledgement and settlement requests are fire-and-forget.
pub trait Transport {
    /// Request a receiving link bound to `target` and grant it initial credit
    fn open_link(&mut self, target: &str, initial_credit: u32) -> Result<LinkHandle>;

    fn grant_credit(&mut self, link: LinkHandle, amount: u32) -> Result<()>;

    /// Wait up to `timeout` for the next event. `None` means nothing arrived.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>>;

    fn decode_delivery(
        &mut self,
        link: LinkHandle,
        delivery: &Delivery,
    ) -> std::result::Result<DecodedMessage, DecodeError>;

    /// Accept an unsettled delivery
    fn acknowledge(&mut self, delivery: &Delivery) -> Result<()>;

    fn settle(&mut self, delivery: Delivery) -> Result<()>;

    fn close_link(&mut self, link: LinkHandle) -> Result<()>;

    /// Close session and connection
    fn close_connection(&mut self) -> Result<()>;

    /// No further events will be produced
    fn is_closed(&self) -> bool;
}
