use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source in milliseconds since the Unix epoch
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use super::Clock;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Shared, manually advanced clock for tests
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ManualClock(Rc<Cell<u64>>);

    impl ManualClock {
        pub(crate) fn at(now_ms: u64) -> Self {
            Self(Rc::new(Cell::new(now_ms)))
        }

        pub(crate) fn set(&self, now_ms: u64) {
            self.0.set(now_ms);
        }

        pub(crate) fn advance(&self, delta_ms: u64) {
            self.0.set(self.0.get() + delta_ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }
}
