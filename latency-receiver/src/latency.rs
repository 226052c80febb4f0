use crate::histogram::LatencyHistogram;

/// Compute a latency sample from a creation/receive timestamp pair.
///
/// Returns `None` when the creation time is absent (0), predates the link
/// becoming active, lies in the future relative to `receive_ms`, or when the
/// link has not become active yet.
pub fn latency_sample(creation_ms: u64, receive_ms: u64, start_ms: Option<u64>) -> Option<u64> {
    let start_ms = start_ms?;
    if creation_ms == 0 || creation_ms < start_ms || receive_ms < creation_ms {
        return None;
    }
    Some(receive_ms - creation_ms)
}

/// Running min/max/sum over valid samples plus their distribution.
#[derive(Debug, Clone, Default)]
pub struct LatencyRecorder {
    min_ms: Option<u64>,
    max_ms: u64,
    sum_ms: u64,
    samples: u64,
    histogram: LatencyHistogram,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample_ms: u64) {
        self.min_ms = Some(self.min_ms.map_or(sample_ms, |min| min.min(sample_ms)));
        self.max_ms = self.max_ms.max(sample_ms);
        self.sum_ms = self.sum_ms.saturating_add(sample_ms);
        self.samples += 1;
        self.histogram.record(sample_ms);
    }

    pub fn min_ms(&self) -> Option<u64> {
        self.min_ms
    }

    pub fn max_ms(&self) -> Option<u64> {
        self.min_ms.map(|_| self.max_ms)
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Mean over valid samples only.
    pub fn average_ms(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum_ms as f64 / self.samples as f64)
    }

    pub fn histogram(&self) -> &LatencyHistogram {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_validity() {
        assert_eq!(latency_sample(1_000, 1_250, Some(900)), Some(250));
        assert_eq!(latency_sample(1_000, 1_000, Some(1_000)), Some(0));
        // absent creation time
        assert_eq!(latency_sample(0, 1_250, Some(0)), None);
        // produced before the link became active
        assert_eq!(latency_sample(800, 1_250, Some(900)), None);
        // clock skew: created "after" it was received
        assert_eq!(latency_sample(1_300, 1_250, Some(900)), None);
        // link not active yet
        assert_eq!(latency_sample(1_000, 1_250, None), None);
    }

    #[test]
    fn test_running_aggregates() {
        let mut recorder = LatencyRecorder::new();
        assert_eq!(recorder.min_ms(), None);
        assert_eq!(recorder.max_ms(), None);
        assert_eq!(recorder.average_ms(), None);

        for sample in [40, 10, 100] {
            recorder.record(sample);
        }

        assert_eq!(recorder.min_ms(), Some(10));
        assert_eq!(recorder.max_ms(), Some(100));
        assert_eq!(recorder.samples(), 3);
        assert_eq!(recorder.average_ms(), Some(50.0));
        assert_eq!(recorder.histogram().total(), 3);
    }

    #[test]
    fn test_zero_latency_sets_minimum() {
        let mut recorder = LatencyRecorder::new();
        recorder.record(5);
        recorder.record(0);
        assert_eq!(recorder.min_ms(), Some(0));
        assert_eq!(recorder.max_ms(), Some(5));
    }
}
