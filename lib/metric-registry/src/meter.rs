/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ewma::TICK_INTERVAL;
use crate::{Clock, Ewma, MonotonicClock};

/// Measures the rate of events, as a mean since creation and as 1, 5 and 15
/// minute moving averages.
pub struct Meter {
    clock: Arc<dyn Clock>,
    start_tick: u64,
    last_tick: AtomicU64,
    count: AtomicU64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Meter {
    pub fn new() -> Self {
        Meter::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start_tick = clock.tick();
        Meter {
            clock,
            start_tick,
            last_tick: AtomicU64::new(start_tick),
            count: AtomicU64::new(0),
            m1: Ewma::one_minute(),
            m5: Ewma::five_minutes(),
            m15: Ewma::fifteen_minutes(),
        }
    }

    #[inline]
    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn mark_n(&self, n: u64) {
        self.tick_if_necessary();
        self.count.fetch_add(n, Ordering::Relaxed);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m1.rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m5.rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m15.rate()
    }

    /// Events per second since the meter was created.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.tick().saturating_sub(self.start_tick);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / (elapsed as f64 / 1_000_000_000.0)
    }

    fn tick_if_necessary(&self) {
        let interval = TICK_INTERVAL.as_nanos() as u64;

        let old_tick = self.last_tick.load(Ordering::Acquire);
        let new_tick = self.clock.tick();
        let age = new_tick.saturating_sub(old_tick);
        if age <= interval {
            return;
        }

        let new_interval_start = new_tick - age % interval;
        if self
            .last_tick
            .compare_exchange(
                old_tick,
                new_interval_start,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            // only the winner of the exchange applies the missed ticks
            let required_ticks = age / interval;
            for _ in 0..required_ticks {
                self.m1.tick();
                self.m5.tick();
                self.m15.tick();
            }
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Meter::new()
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
