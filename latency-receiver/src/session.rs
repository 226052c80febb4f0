use crate::flow::FlowController;
use crate::latency::{LatencyRecorder, latency_sample};
use crate::message::MessageRecord;
use crate::report::StatsSnapshot;
use crate::sequence::{SequenceStatus, SequenceTracker};

/// Remaining messages to accept before the link is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLimit {
    Unlimited,
    Remaining(u64),
}

impl MessageLimit {
    /// Non-positive counts mean "receive forever".
    pub fn from_count(count: i64) -> Self {
        if count > 0 {
            MessageLimit::Remaining(count as u64)
        } else {
            MessageLimit::Unlimited
        }
    }

    /// Count one accepted message. Returns true exactly when the limit is reached.
    pub fn consume(&mut self) -> bool {
        match self {
            MessageLimit::Remaining(remaining) if *remaining > 0 => {
                *remaining -= 1;
                *remaining == 0
            }
            _ => false,
        }
    }
}

/// Link-lifetime state owned by the dispatcher
#[derive(Debug, Clone)]
pub struct SessionState {
    target: String,
    flow: FlowController,
    outstanding_credit: u32,
    message_limit: MessageLimit,
    sequence: SequenceTracker,
    latency: LatencyRecorder,
    received: u64,
    decode_failures: u64,
    start_ms: Option<u64>,
}

impl SessionState {
    pub fn new(target: impl Into<String>, credit_window: u32, message_limit: MessageLimit, first_sequence: u64) -> Self {
        Self {
            target: target.into(),
            flow: FlowController::new(credit_window),
            outstanding_credit: 0,
            message_limit,
            sequence: SequenceTracker::new(first_sequence),
            latency: LatencyRecorder::new(),
            received: 0,
            decode_failures: 0,
            start_ms: None,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn credit_window(&self) -> u32 {
        self.flow.window()
    }

    pub fn outstanding_credit(&self) -> u32 {
        self.outstanding_credit
    }

    pub fn message_limit(&self) -> MessageLimit {
        self.message_limit
    }

    pub fn start_ms(&self) -> Option<u64> {
        self.start_ms
    }

    pub fn sequence(&self) -> &SequenceTracker {
        &self.sequence
    }

    pub fn latency(&self) -> &LatencyRecorder {
        &self.latency
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Record when the link became active; later calls keep the first time
    pub fn mark_active(&mut self, now_ms: u64) {
        self.start_ms.get_or_insert(now_ms);
    }

    pub fn credit_granted(&mut self, amount: u32) {
        self.outstanding_credit = self.outstanding_credit.saturating_add(amount);
    }

    /// One credit is used up by every complete delivery
    pub fn credit_consumed(&mut self) {
        self.outstanding_credit = self.outstanding_credit.saturating_sub(1);
    }

    /// Credit to grant now, 0 when the window is still healthy
    pub fn replenish_amount(&self) -> u32 {
        self.flow.credit_check(self.outstanding_credit)
    }

    /// Account for an accepted message. Returns the sequence status and the
    /// latency sample when one was recorded.
    pub fn record_message(
        &mut self,
        record: &MessageRecord,
        receive_ms: u64,
        measure_latency: bool,
    ) -> (SequenceStatus, Option<u64>) {
        let sample = if measure_latency {
            record
                .creation_ms
                .and_then(|creation| latency_sample(creation, receive_ms, self.start_ms))
        } else {
            None
        };
        if let Some(sample) = sample {
            self.latency.record(sample);
        }

        let status = self.sequence.process_sequence(record.sequence_id);
        self.received += 1;
        (status, sample)
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    /// True when this message exhausted the configured limit
    pub fn consume_limit(&mut self) -> bool {
        self.message_limit.consume()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received,
            dropped: self.sequence.dropped(),
            duplicates: self.sequence.duplicates(),
            decode_failures: self.decode_failures,
            samples: self.latency.samples(),
            min_ms: self.latency.min_ms(),
            max_ms: self.latency.max_ms(),
            average_ms: self.latency.average_ms(),
            buckets: self.latency.histogram().buckets().collect(),
            overflow: self.latency.histogram().overflow(),
        }
    }
}
