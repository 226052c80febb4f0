use std::collections::VecDeque;
use std::time::Duration;

use super::{LinkHandle, Transport};
use crate::error::{Error, Result};
use crate::event::{Delivery, Event};
use crate::message::{DecodeError, DecodedMessage};

/// Scripted transport: replays a fixed event list and records every request
#[derive(Debug, Default)]
pub(crate) struct MemoryTransport {
    script: VecDeque<Event>,
    pub(crate) opened: Option<(String, u32)>,
    pub(crate) credit_grants: Vec<u32>,
    pub(crate) acknowledged: Vec<u64>,
    pub(crate) settled: Vec<u64>,
    pub(crate) link_closed: bool,
    pub(crate) connection_closed: bool,
    pub(crate) polls: usize,
}

impl MemoryTransport {
    pub(crate) fn new(script: impl IntoIterator<Item = Event>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Transport for MemoryTransport {
    fn open_link(&mut self, target: &str, initial_credit: u32) -> Result<LinkHandle> {
        self.opened = Some((target.to_string(), initial_credit));
        Ok(LinkHandle(1))
    }

    fn grant_credit(&mut self, _link: LinkHandle, amount: u32) -> Result<()> {
        if self.opened.is_none() {
            return Err(Error::LinkNotOpen);
        }
        self.credit_grants.push(amount);
        Ok(())
    }

    fn poll_event(&mut self, _timeout: Duration) -> Result<Option<Event>> {
        self.polls += 1;
        Ok(self.script.pop_front())
    }

    fn decode_delivery(
        &mut self,
        _link: LinkHandle,
        delivery: &Delivery,
    ) -> std::result::Result<DecodedMessage, DecodeError> {
        DecodedMessage::decode(&delivery.payload)
    }

    fn acknowledge(&mut self, delivery: &Delivery) -> Result<()> {
        self.acknowledged.push(delivery.tag);
        Ok(())
    }

    fn settle(&mut self, delivery: Delivery) -> Result<()> {
        self.settled.push(delivery.tag);
        Ok(())
    }

    fn close_link(&mut self, _link: LinkHandle) -> Result<()> {
        self.link_closed = true;
        Ok(())
    }

    fn close_connection(&mut self) -> Result<()> {
        self.connection_closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.connection_closed || self.script.is_empty()
    }
}
