/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use portable_atomic::AtomicF64;

pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially weighted moving average of an event rate, in events per
/// second, updated once per [`TICK_INTERVAL`].
pub struct Ewma {
    alpha: f64,
    uncounted: AtomicU64,
    rate: AtomicF64,
    initialized: AtomicBool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        let interval = TICK_INTERVAL.as_secs_f64();
        let alpha = 1.0 - (-interval / 60.0 / minutes).exp();
        Ewma::new(alpha)
    }

    pub fn new(alpha: f64) -> Self {
        Ewma {
            alpha,
            uncounted: AtomicU64::new(0),
            rate: AtomicF64::new(0.0),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn one_minute() -> Self {
        Ewma::with_minutes(1.0)
    }

    pub fn five_minutes() -> Self {
        Ewma::with_minutes(5.0)
    }

    pub fn fifteen_minutes() -> Self {
        Ewma::with_minutes(15.0)
    }

    #[inline]
    pub fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Fold the events seen since the last tick into the average.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::Relaxed);
        let instant_rate = count as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized.swap(true, Ordering::AcqRel) {
            let rate = self.rate.load(Ordering::Relaxed);
            self.rate
                .store(rate + self.alpha * (instant_rate - rate), Ordering::Relaxed);
        } else {
            self.rate.store(instant_rate, Ordering::Relaxed);
        }
    }

    /// Events per second.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick() {
        let e = Ewma::one_minute();
        e.update(5);
        assert_eq!(e.rate(), 0.0);
        e.tick();
        assert!((e.rate() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay() {
        let e = Ewma::one_minute();
        e.update(300);
        e.tick();
        let first = e.rate();
        for _ in 0..12 {
            e.tick();
        }
        // one minute without events
        let expected = first * (-1.0f64).exp();
        assert!((e.rate() - expected).abs() < 1e-6);
    }

    #[test]
    fn slower_windows_decay_slower() {
        let m1 = Ewma::one_minute();
        let m15 = Ewma::fifteen_minutes();
        m1.update(100);
        m15.update(100);
        m1.tick();
        m15.tick();
        m1.tick();
        m15.tick();
        assert!(m15.rate() > m1.rate());
    }
}
