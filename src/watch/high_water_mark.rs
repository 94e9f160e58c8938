use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Tracks how backed up the most backed up channel got.
///
/// Diagnostic only: nothing branches on it besides logging.
#[derive(Debug, Default)]
pub struct HighWaterMark(AtomicUsize);

impl HighWaterMark {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Records `current` and returns true if it is a new maximum.
    pub fn update(
        &self,
        current: usize,
    ) -> bool {
        self.0.fetch_max(current, Ordering::AcqRel) < current
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}
