/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use hdrhistogram::CreationError;
use thiserror::Error;

use crate::{Clock, Counter, Gauge, Histogram, Meter, MonotonicClock, Timer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("empty metric name")]
    EmptyName,
    #[error("metric {name} is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
    #[error("gauge {0} is already registered")]
    GaugeExists(String),
    #[error("failed to create histogram: {0}")]
    Histogram(#[from] CreationError),
}

enum Entry {
    Gauge(Arc<Gauge>),
    Counter(Arc<Counter>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Entry {
    fn kind(&self) -> MetricKind {
        match self {
            Entry::Gauge(_) => MetricKind::Gauge,
            Entry::Counter(_) => MetricKind::Counter,
            Entry::Histogram(_) => MetricKind::Histogram,
            Entry::Meter(_) => MetricKind::Meter,
            Entry::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Name sorted views of every metric kind, taken at one point in time.
#[derive(Default)]
pub struct MetricsSnapshot {
    pub gauges: BTreeMap<String, Arc<Gauge>>,
    pub counters: BTreeMap<String, Arc<Counter>>,
    pub histograms: BTreeMap<String, Arc<Histogram>>,
    pub meters: BTreeMap<String, Arc<Meter>>,
    pub timers: BTreeMap<String, Arc<Timer>>,
}

impl MetricsSnapshot {
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process wide set of named metrics.
pub struct MetricRegistry {
    clock: Arc<dyn Clock>,
    metrics: RwLock<BTreeMap<String, Entry>>,
}

macro_rules! get_or_create {
    ($self:ident, $name:ident, $variant:ident, $create:expr) => {{
        if $name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut metrics = $self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        match metrics.get($name) {
            Some(Entry::$variant(m)) => Ok(m.clone()),
            Some(other) => Err(RegistryError::KindMismatch {
                name: $name.to_string(),
                existing: other.kind(),
                requested: MetricKind::$variant,
            }),
            None => {
                let m = Arc::new($create);
                metrics.insert($name.to_string(), Entry::$variant(m.clone()));
                Ok(m)
            }
        }
    }};
}

impl MetricRegistry {
    pub fn new() -> Self {
        MetricRegistry::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        MetricRegistry {
            clock,
            metrics: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        get_or_create!(self, name, Counter, Counter::new())
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, RegistryError> {
        get_or_create!(self, name, Meter, Meter::with_clock(self.clock.clone()))
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        get_or_create!(self, name, Histogram, Histogram::new()?)
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        get_or_create!(self, name, Timer, Timer::with_clock(self.clock.clone())?)
    }

    pub fn register_gauge(&self, name: &str, gauge: Gauge) -> Result<Arc<Gauge>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        match metrics.get(name) {
            Some(Entry::Gauge(_)) => Err(RegistryError::GaugeExists(name.to_string())),
            Some(other) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing: other.kind(),
                requested: MetricKind::Gauge,
            }),
            None => {
                let gauge = Arc::new(gauge);
                metrics.insert(name.to_string(), Entry::Gauge(gauge.clone()));
                Ok(gauge)
            }
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        metrics.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = MetricsSnapshot::default();
        for (name, entry) in metrics.iter() {
            let name = name.clone();
            match entry {
                Entry::Gauge(m) => {
                    snapshot.gauges.insert(name, m.clone());
                }
                Entry::Counter(m) => {
                    snapshot.counters.insert(name, m.clone());
                }
                Entry::Histogram(m) => {
                    snapshot.histograms.insert(name, m.clone());
                }
                Entry::Meter(m) => {
                    snapshot.meters.insert(name, m.clone());
                }
                Entry::Timer(m) => {
                    snapshot.timers.insert(name, m.clone());
                }
            }
        }
        snapshot
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        MetricRegistry::new()
    }
}
