use std::time::Duration;

/// Dummy timer when `timing` is disabled (zero-sized).
pub struct Timer;

impl Timer {
    #[inline(always)]
    pub fn start() -> Self {
        Self
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}

/// Dummy timings when `timing` is disabled (zero-sized).
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchTimings;

impl BatchTimings {
    #[inline(always)]
    pub fn report(&self, _n: usize, _chunks: usize) {}

    #[inline(always)]
    pub fn total(&self) -> Duration {
        Duration::ZERO
    }
}

/// Dummy builder when `timing` is disabled.
pub struct TimingBuilder;

impl TimingBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self
    }

    #[inline(always)]
    pub fn set_plan(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn set_dispatch(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn set_drain(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn finish(self) -> BatchTimings {
        BatchTimings
    }
}
