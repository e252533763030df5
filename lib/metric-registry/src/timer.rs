/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::CreationError;

use crate::{Clock, Histogram, HistogramSnapshot, Meter, MonotonicClock, SnapshotError};

/// A meter of event rates plus a histogram of their durations, recorded in
/// nanoseconds.
pub struct Timer {
    clock: Arc<dyn Clock>,
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    pub fn new() -> Result<Self, CreationError> {
        Timer::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Result<Self, CreationError> {
        Ok(Timer {
            meter: Meter::with_clock(clock.clone()),
            histogram: Histogram::new()?,
            clock,
        })
    }

    pub fn update(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.update_nanos(nanos);
    }

    fn update_nanos(&self, nanos: u64) {
        self.histogram.update(nanos);
        self.meter.mark();
    }

    /// Start timing an operation, the elapsed time is recorded when the
    /// returned context is stopped or dropped.
    pub fn time(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            start: self.clock.tick(),
            stopped: false,
        }
    }

    pub fn time_fn<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let ctx = self.time();
        let r = f();
        ctx.stop();
        r
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    pub fn snapshot(&self) -> Result<HistogramSnapshot, SnapshotError> {
        self.histogram.snapshot()
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn poison(&self) {
        self.histogram.poison();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: u64,
    stopped: bool,
}

impl TimerContext<'_> {
    /// Record the elapsed time and return it.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        self.stopped = true;
        let elapsed = self.timer.clock.tick().saturating_sub(self.start);
        self.timer.update_nanos(elapsed);
        Duration::from_nanos(elapsed)
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    #[test]
    fn context() {
        let clock = Arc::new(ManualClock::new());
        let timer = Timer::with_clock(clock.clone()).unwrap();

        let ctx = timer.time();
        clock.advance(Duration::from_millis(20));
        let elapsed = ctx.stop();
        assert_eq!(elapsed, Duration::from_millis(20));
        assert_eq!(timer.count(), 1);

        let s = timer.snapshot().unwrap();
        assert_eq!(s.size(), 1);
        let max = s.max();
        // 3 significant figures
        assert!((19_980_000..=20_020_000).contains(&max));
    }

    #[test]
    fn drop_records() {
        let clock = Arc::new(ManualClock::new());
        let timer = Timer::with_clock(clock.clone()).unwrap();
        {
            let _ctx = timer.time();
            clock.advance(Duration::from_millis(5));
        }
        assert_eq!(timer.count(), 1);
    }

    #[test]
    fn time_fn() {
        let timer = Timer::new().unwrap();
        let v = timer.time_fn(|| 42);
        assert_eq!(v, 42);
        assert_eq!(timer.count(), 1);
    }

    #[test]
    fn update() {
        let timer = Timer::new().unwrap();
        timer.update(Duration::from_micros(150));
        timer.update(Duration::from_micros(250));
        assert_eq!(timer.count(), 2);
        let min = timer.snapshot().unwrap().min();
        assert!((149_850..=150_150).contains(&min));
    }
}
