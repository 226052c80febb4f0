use std::cmp::Ordering;
use tracing::debug;

/// Ordering status of an arriving sequence id relative to the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
    InOrder,
    /// Number of messages presumed lost ahead of this one
    Gap(u64),
    /// Older than expected, treated as a retransmit
    Duplicate,
}

/// Classify `id` against `expected` without mutating anything.
pub fn classify(id: u64, expected: u64) -> SequenceStatus {
    match id.cmp(&expected) {
        Ordering::Equal => SequenceStatus::InOrder,
        Ordering::Greater => SequenceStatus::Gap(id - expected),
        Ordering::Less => SequenceStatus::Duplicate,
    }
}

/// Tracks the next expected id of a single monotonic producer
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    next_expected: u64,
    /// Set once `u64::MAX` has been accepted; nothing can follow it in order
    exhausted: bool,
    dropped: u64,
    duplicates: u64,
}

impl SequenceTracker {
    pub fn new(first_expected: u64) -> Self {
        Self {
            next_expected: first_expected,
            exhausted: false,
            dropped: 0,
            duplicates: 0,
        }
    }

    /// Process a sequence id and return its ordering status
    pub fn process_sequence(&mut self, sequence: u64) -> SequenceStatus {
        let status = if self.exhausted {
            SequenceStatus::Duplicate
        } else {
            classify(sequence, self.next_expected)
        };
        match status {
            SequenceStatus::InOrder => {
                self.advance_past(sequence);
            }
            SequenceStatus::Gap(gap_size) => {
                debug!(
                    "Sequence mismatch! Expected {}, got {} ({} missing)",
                    self.next_expected, sequence, gap_size
                );
                self.dropped = self.dropped.saturating_add(gap_size);
                self.advance_past(sequence);
            }
            SequenceStatus::Duplicate => {
                // leave next_expected alone so a late retransmit is absorbed
                debug!(
                    "Sequence mismatch! Expected {}, got {} (retransmit)",
                    self.next_expected, sequence
                );
                self.duplicates = self.duplicates.saturating_add(1);
            }
        }
        status
    }

    fn advance_past(&mut self, sequence: u64) {
        match sequence.checked_add(1) {
            Some(next) => self.next_expected = next,
            None => {
                self.next_expected = u64::MAX;
                self.exhausted = true;
            }
        }
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gap_then_retransmit() {
        let mut tracker = SequenceTracker::new(0);

        assert_eq!(tracker.process_sequence(0), SequenceStatus::InOrder);
        assert_eq!(tracker.process_sequence(1), SequenceStatus::InOrder);
        assert_eq!(tracker.process_sequence(2), SequenceStatus::InOrder);
        assert_eq!(tracker.process_sequence(5), SequenceStatus::Gap(3));
        assert_eq!(tracker.next_expected(), 6);
        assert_eq!(tracker.process_sequence(4), SequenceStatus::Duplicate);
        assert_eq!(tracker.next_expected(), 6);
        assert_eq!(tracker.process_sequence(6), SequenceStatus::InOrder);
        assert_eq!(tracker.next_expected(), 7);

        assert_eq!(tracker.dropped(), 3);
        assert_eq!(tracker.duplicates(), 1);
    }

    #[test]
    fn test_custom_first_sequence() {
        let mut tracker = SequenceTracker::new(1000);
        assert_eq!(tracker.process_sequence(999), SequenceStatus::Duplicate);
        assert_eq!(tracker.process_sequence(1000), SequenceStatus::InOrder);
        assert_eq!(tracker.dropped(), 0);
    }

    #[test]
    fn test_ids_after_max_are_duplicates() {
        let mut tracker = SequenceTracker::new(0);
        assert_eq!(tracker.process_sequence(u64::MAX), SequenceStatus::Gap(u64::MAX));
        assert_eq!(tracker.next_expected(), u64::MAX);
        assert_eq!(tracker.process_sequence(1), SequenceStatus::Duplicate);
        assert_eq!(tracker.process_sequence(u64::MAX), SequenceStatus::Duplicate);
        assert_eq!(tracker.dropped(), u64::MAX);
        assert_eq!(tracker.duplicates(), 2);
    }

    #[test]
    fn test_in_order_up_to_max() {
        let mut tracker = SequenceTracker::new(0);
        assert_eq!(tracker.process_sequence(u64::MAX - 1), SequenceStatus::Gap(u64::MAX - 1));
        assert_eq!(tracker.process_sequence(u64::MAX), SequenceStatus::InOrder);
        assert_eq!(tracker.process_sequence(0), SequenceStatus::Duplicate);
        assert_eq!(tracker.dropped(), u64::MAX - 1);
        assert_eq!(tracker.duplicates(), 1);
    }

    proptest! {
        #[test]
        fn prop_in_order_advances_by_one(expected in 0u64..u64::MAX) {
            let mut tracker = SequenceTracker::new(expected);
            prop_assert_eq!(tracker.process_sequence(expected), SequenceStatus::InOrder);
            prop_assert_eq!(tracker.next_expected(), expected + 1);
        }

        #[test]
        fn prop_gap_counts_missing(expected in 0u64..1_000_000, ahead in 1u64..1_000_000) {
            let mut tracker = SequenceTracker::new(expected);
            let id = expected + ahead;
            prop_assert_eq!(tracker.process_sequence(id), SequenceStatus::Gap(ahead));
            prop_assert_eq!(tracker.dropped(), ahead);
            prop_assert_eq!(tracker.next_expected(), id + 1);
        }

        #[test]
        fn prop_regression_is_duplicate(expected in 1u64..1_000_000, behind in 1u64..1_000_000) {
            let id = expected.saturating_sub(behind);
            prop_assume!(id < expected);
            let mut tracker = SequenceTracker::new(expected);
            prop_assert_eq!(tracker.process_sequence(id), SequenceStatus::Duplicate);
            prop_assert_eq!(tracker.duplicates(), 1);
            prop_assert_eq!(tracker.next_expected(), expected);
        }
    }
}
