use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::clock::Clock;
use crate::config::ReceiverConfig;
use crate::error::{Error, Result};
use crate::event::{Condition, Delivery, Event};
use crate::message::MessageRecord;
use crate::report::{Reporter, StatsSnapshot};
use crate::session::SessionState;
use crate::shutdown::StopFlag;
use crate::trace::LatencyTrace;
use crate::transport::{LinkHandle, Transport};

/// Wake interval of the transport poll, bounds how late a periodic report can be
pub const WAKE_INTERVAL: Duration = Duration::from_secs(1);

/// Single control loop routing transport events into the statistics core
pub struct Dispatcher<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    session: SessionState,
    link: Option<LinkHandle>,
    measure_latency: bool,
    trace: Option<LatencyTrace<Box<dyn Write>>>,
    wake_interval: Duration,
}

impl<T: Transport, C: Clock> Dispatcher<T, C> {
    pub fn new(transport: T, clock: C, config: &ReceiverConfig) -> Self {
        Self {
            transport,
            clock,
            session: SessionState::new(
                config.target.clone(),
                config.credit_window,
                config.message_limit,
                config.first_sequence,
            ),
            link: None,
            measure_latency: config.latency,
            trace: None,
            wake_interval: WAKE_INTERVAL,
        }
    }

    pub fn with_trace(mut self, trace: LatencyTrace<Box<dyn Write>>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.session.snapshot()
    }

    /// Run until the transport closes or a stop is requested, then render the
    /// final report when latency measurement is on. A fatal error still gets
    /// the final report before it is returned.
    pub fn run(&mut self, stop: &StopFlag, reporter: &mut Reporter, out: &mut dyn Write) -> Result<()> {
        let outcome = self.process_events(stop, reporter, out);

        if self.measure_latency {
            if let Err(e) = reporter.render(&self.session.snapshot(), out) {
                warn!("Failed to write final report: {}", e);
            }
        }
        outcome
    }

    fn process_events(&mut self, stop: &StopFlag, reporter: &mut Reporter, out: &mut dyn Write) -> Result<()> {
        while !stop.is_stopped() && !self.transport.is_closed() {
            let event = self
                .transport
                .poll_event(self.wake_interval)?
                .unwrap_or(Event::Tick);
            self.handle(event)?;

            let session = &self.session;
            reporter.tick(self.clock.now_ms(), || session.snapshot(), out)?;
        }

        if stop.is_stopped() {
            info!("Stop requested, leaving receive loop");
        } else {
            info!("Connection closed");
        }
        Ok(())
    }

    /// Apply exactly one state transition for `event`
    pub fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::ConnectionInit => self.on_connection_init(),
            Event::LinkRemoteOpen => {
                let now = self.clock.now_ms();
                self.session.mark_active(now);
                info!("Link to '{}' is active", self.session.target());
                Ok(())
            }
            Event::LinkRemoteClose => {
                info!("Link closed by peer, closing connection");
                self.link = None;
                self.transport.close_connection()
            }
            Event::Delivery(delivery) => self.on_delivery(delivery),
            Event::TransportError(condition) => {
                log_transport_failure(&condition);
                Ok(())
            }
            Event::Tick => Ok(()),
            Event::Other(kind) => {
                trace!("Ignoring {} event", kind);
                Ok(())
            }
        }
    }

    fn on_connection_init(&mut self) -> Result<()> {
        let window = self.session.credit_window();
        let link = self.transport.open_link(self.session.target(), window)?;
        self.session.credit_granted(window);
        self.link = Some(link);
        info!(
            "Receiving from '{}' with a credit window of {}",
            self.session.target(),
            window
        );
        Ok(())
    }

    fn on_delivery(&mut self, delivery: Delivery) -> Result<()> {
        if !delivery.is_complete() {
            trace!("Delivery {} not complete yet", delivery.tag);
            return Ok(());
        }
        let link = self.link.ok_or(Error::LinkNotOpen)?;
        let now = self.clock.now_ms();
        self.session.credit_consumed();

        let accepted = match self.transport.decode_delivery(link, &delivery) {
            Ok(message) => {
                let record = MessageRecord::try_from(message).map_err(Error::BadSequenceType)?;
                self.accept(&record, now)?;
                true
            }
            Err(e) => {
                warn!("Failed to decode delivery {}: {}", delivery.tag, e);
                self.session.record_decode_failure();
                false
            }
        };

        if !delivery.settled {
            // sender is tracking this delivery, tell it we have it
            self.transport.acknowledge(&delivery)?;
        }
        self.transport.settle(delivery)?;

        let replenish = self.session.replenish_amount();
        if replenish > 0 {
            self.transport.grant_credit(link, replenish)?;
            self.session.credit_granted(replenish);
            trace!("Granted {} credit", replenish);
        }

        if accepted && self.session.consume_limit() {
            info!("Received all expected messages, closing link");
            self.transport.close_link(link)?;
        }
        Ok(())
    }

    fn accept(&mut self, record: &MessageRecord, now_ms: u64) -> Result<()> {
        let (status, sample) = self
            .session
            .record_message(record, now_ms, self.measure_latency);
        debug!(
            "Message received! seq={} status={:?} body={}",
            record.sequence_id,
            status,
            record.body_preview()
        );

        if let Some(latency) = sample {
            debug!("latency {}", latency);
            if let (Some(trace), Some(then)) = (self.trace.as_mut(), record.creation_ms) {
                trace.record(then, now_ms, latency)?;
            }
        }
        Ok(())
    }
}

fn log_transport_failure(condition: &Condition) {
    error!("Network transport failed!");
    if condition.name.is_some() || condition.description.is_some() {
        error!(
            "    Error: {}  Description: {}",
            condition
                .name
                .as_deref()
                .unwrap_or("<error name not provided>"),
            condition
                .description
                .as_deref()
                .unwrap_or("<no description provided>")
        );
    }
}
