//! Fixed-shape logarithmic latency histogram.
//!
//! Four decades (0-99, 100-999, 1000-9999, 10000-99999 ms), each split into
//! 100 buckets. Anything at or above 100 seconds lands in `overflow`.

/// Number of decades tracked before a sample counts as overflow.
pub const MAX_ORDER: usize = 4;
pub const BUCKETS_PER_ORDER: usize = 100;

/// Upper (exclusive) bound of the histogram in milliseconds.
pub const OVERFLOW_THRESHOLD_MS: u64 = 100_000;

/// One populated bucket, as seen by the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub order: usize,
    pub index: usize,
    pub count: u64,
}

impl Bucket {
    /// Width of a bucket in this order: 1, 10, 100 or 1000 ms.
    pub fn width_ms(&self) -> u64 {
        10u64.pow(self.order as u32)
    }

    pub fn lower_ms(&self) -> u64 {
        self.index as u64 * self.width_ms()
    }

    pub fn upper_ms(&self) -> u64 {
        self.lower_ms() + self.width_ms() - 1
    }

    /// Midpoint used for CSV output. Order 0 buckets are exact.
    pub fn midpoint_ms(&self) -> u64 {
        self.lower_ms() + self.width_ms() / 2
    }
}

#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    distribution: [[u64; BUCKETS_PER_ORDER]; MAX_ORDER],
    overflow: u64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            distribution: [[0; BUCKETS_PER_ORDER]; MAX_ORDER],
            overflow: 0,
        }
    }

    /// Bucket position for a sample, `None` when it belongs in overflow.
    pub fn locate(sample_ms: u64) -> Option<(usize, usize)> {
        match sample_ms {
            0..100 => Some((0, sample_ms as usize)),
            100..1_000 => Some((1, (sample_ms / 10) as usize)),
            1_000..10_000 => Some((2, (sample_ms / 100) as usize)),
            10_000..OVERFLOW_THRESHOLD_MS => Some((3, (sample_ms / 1_000) as usize)),
            _ => None,
        }
    }

    pub fn record(&mut self, sample_ms: u64) {
        match Self::locate(sample_ms) {
            Some((order, index)) => self.distribution[order][index] += 1,
            None => self.overflow += 1,
        }
    }

    pub fn count(&self, order: usize, index: usize) -> u64 {
        self.distribution
            .get(order)
            .and_then(|buckets| buckets.get(index))
            .copied()
            .unwrap_or(0)
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Total samples seen, including overflow.
    pub fn total(&self) -> u64 {
        self.distribution.iter().flatten().sum::<u64>() + self.overflow
    }

    /// Non-empty buckets in ascending latency order.
    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.distribution
            .iter()
            .enumerate()
            .flat_map(|(order, buckets)| {
                buckets
                    .iter()
                    .enumerate()
                    .filter(|(_, count)| **count > 0)
                    .map(move |(index, &count)| Bucket { order, index, count })
            })
    }
}
