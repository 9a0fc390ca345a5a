use std::time::Duration;

/// Timer that tracks elapsed time when timing is enabled.
pub struct Timer(std::time::Instant);

impl Timer {
    #[inline]
    pub fn start() -> Self {
        Self(std::time::Instant::now())
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Phase timings for one batch.
///
/// `drain` covers waiting for workers plus in-order aggregation and row
/// emission, which overlap with chunk computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchTimings {
    pub plan: Duration,
    pub dispatch: Duration,
    pub drain: Duration,
}

impl BatchTimings {
    pub fn total(&self) -> Duration {
        self.plan + self.dispatch + self.drain
    }

    pub fn report(&self, n: usize, chunks: usize) {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let total = ms(self.total());
        let rate = if total > 0.0 {
            n as f64 / (total / 1000.0)
        } else {
            0.0
        };
        tracing::debug!(
            n,
            chunks,
            plan_ms = ms(self.plan),
            dispatch_ms = ms(self.dispatch),
            drain_ms = ms(self.drain),
            total_ms = total,
            entities_per_sec = rate,
            "batch timings"
        );
    }
}

pub struct TimingBuilder {
    timings: BatchTimings,
}

impl TimingBuilder {
    pub fn new() -> Self {
        Self {
            timings: BatchTimings::default(),
        }
    }

    pub fn set_plan(&mut self, d: Duration) {
        self.timings.plan = d;
    }

    pub fn set_dispatch(&mut self, d: Duration) {
        self.timings.dispatch = d;
    }

    pub fn set_drain(&mut self, d: Duration) {
        self.timings.drain = d;
    }

    pub fn finish(self) -> BatchTimings {
        self.timings
    }
}
