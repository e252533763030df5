/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Mutex;

use hdrhistogram::CreationError;
use thiserror::Error;

const SIGNIFICANT_FIGURES: u8 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("histogram state poisoned by a panicked writer")]
    Poisoned,
}

/// A uniform distribution of all values recorded since creation.
pub struct Histogram {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl Histogram {
    pub fn new() -> Result<Self, CreationError> {
        let mut inner = hdrhistogram::Histogram::new(SIGNIFICANT_FIGURES)?;
        inner.auto(true);
        Ok(Histogram {
            inner: Mutex::new(inner),
        })
    }

    pub fn update(&self, value: u64) {
        // a poisoned histogram drops new samples, snapshots report the error
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.record(value);
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> Result<HistogramSnapshot, SnapshotError> {
        let inner = self.inner.lock().map_err(|_| SnapshotError::Poisoned)?;
        Ok(HistogramSnapshot {
            inner: inner.clone(),
        })
    }

    /// Poison the inner state as a writer panicking under the lock would.
    #[cfg(any(test, feature = "test-util"))]
    pub fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.inner.lock();
            panic!("poison histogram");
        }));
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("count", &self.count())
            .finish()
    }
}

/// A point-in-time copy of a histogram. An empty snapshot reports zero for
/// every statistic.
#[derive(Clone)]
pub struct HistogramSnapshot {
    inner: hdrhistogram::Histogram<u64>,
}

impl HistogramSnapshot {
    #[inline]
    pub fn size(&self) -> u64 {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn min(&self) -> u64 {
        if self.is_empty() { 0 } else { self.inner.min() }
    }

    pub fn max(&self) -> u64 {
        if self.is_empty() { 0 } else { self.inner.max() }
    }

    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.inner.mean()
        }
    }

    pub fn std_dev(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.inner.stdev()
        }
    }

    pub fn value_at(&self, quantile: f64) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.inner.value_at_quantile(quantile)
        }
    }

    pub fn median(&self) -> u64 {
        self.value_at(0.5)
    }

    pub fn p75(&self) -> u64 {
        self.value_at(0.75)
    }

    pub fn p95(&self) -> u64 {
        self.value_at(0.95)
    }

    pub fn p99(&self) -> u64 {
        self.value_at(0.99)
    }

    pub fn p999(&self) -> u64 {
        self.value_at(0.999)
    }
}
