/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use metric_registry::{
    Counter, Gauge, Histogram, HistogramSnapshot, Meter, MetricKind, SnapshotError, Timer,
};

use crate::types::{FieldSet, FieldValue};

mod unit;
pub use unit::TimeUnit;

pub const FIELD_COUNT: &str = "count";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_ONE_MINUTE: &str = "one-minute";
pub const FIELD_FIVE_MINUTE: &str = "five-minute";
pub const FIELD_FIFTEEN_MINUTE: &str = "fifteen-minute";
pub const FIELD_MEAN_MINUTE: &str = "mean-minute";
pub const FIELD_MIN: &str = "min";
pub const FIELD_MAX: &str = "max";
pub const FIELD_MEAN: &str = "mean";
pub const FIELD_STD_DEV: &str = "std-dev";
pub const FIELD_P50: &str = "50-percentile";
pub const FIELD_P75: &str = "75-percentile";
pub const FIELD_P95: &str = "95-percentile";
pub const FIELD_P99: &str = "99-percentile";
pub const FIELD_P999: &str = "999-percentile";
pub const FIELD_RUN_COUNT: &str = "run-count";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unable to read snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// A borrowed metric of any kind.
#[derive(Clone, Copy)]
pub enum MetricRef<'a> {
    Gauge(&'a Gauge),
    Counter(&'a Counter),
    Histogram(&'a Histogram),
    Meter(&'a Meter),
    Timer(&'a Timer),
}

impl MetricRef<'_> {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRef::Gauge(_) => MetricKind::Gauge,
            MetricRef::Counter(_) => MetricKind::Counter,
            MetricRef::Histogram(_) => MetricKind::Histogram,
            MetricRef::Meter(_) => MetricKind::Meter,
            MetricRef::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Turns metrics into their field sets.
///
/// Native rates are events per second and native durations are nanoseconds,
/// both scaled once here into the configured units.
#[derive(Clone, Copy, Debug)]
pub struct FieldExtractor {
    rate_unit: TimeUnit,
    duration_unit: TimeUnit,
    rate_factor: f64,
    duration_factor: f64,
}

impl FieldExtractor {
    pub fn new(rate_unit: TimeUnit, duration_unit: TimeUnit) -> Self {
        FieldExtractor {
            rate_unit,
            duration_unit,
            rate_factor: rate_unit.as_nanos() as f64 / 1_000_000_000.0,
            duration_factor: 1.0 / duration_unit.as_nanos() as f64,
        }
    }

    #[inline]
    pub fn rate_unit(&self) -> TimeUnit {
        self.rate_unit
    }

    #[inline]
    pub fn duration_unit(&self) -> TimeUnit {
        self.duration_unit
    }

    /// `None` when the metric has nothing to report this cycle.
    pub fn extract(&self, metric: MetricRef<'_>) -> Result<Option<FieldSet>, ExtractionError> {
        match metric {
            MetricRef::Gauge(g) => Ok(self.extract_gauge(g)),
            MetricRef::Counter(c) => Ok(Some(self.extract_counter(c))),
            MetricRef::Histogram(h) => self.extract_histogram(h).map(Some),
            MetricRef::Meter(m) => Ok(Some(self.extract_meter(m))),
            MetricRef::Timer(t) => self.extract_timer(t).map(Some),
        }
    }

    fn extract_gauge(&self, gauge: &Gauge) -> Option<FieldSet> {
        let value = gauge.value()?;
        let mut fields = FieldSet::with_capacity(1);
        fields.push(FIELD_VALUE, FieldValue::from(value));
        Some(fields)
    }

    fn extract_counter(&self, counter: &Counter) -> FieldSet {
        let mut fields = FieldSet::with_capacity(1);
        fields.push(FIELD_COUNT, counter.count());
        fields
    }

    fn extract_meter(&self, meter: &Meter) -> FieldSet {
        let mut fields = FieldSet::with_capacity(5);
        fields.push(FIELD_COUNT, meter.count());
        self.push_rates(
            &mut fields,
            meter.one_minute_rate(),
            meter.five_minute_rate(),
            meter.fifteen_minute_rate(),
            meter.mean_rate(),
        );
        fields
    }

    fn extract_histogram(&self, histogram: &Histogram) -> Result<FieldSet, ExtractionError> {
        let snapshot = histogram.snapshot()?;
        let mut fields = FieldSet::with_capacity(11);
        push_distribution(&mut fields, &snapshot, 1.0);
        fields.push(FIELD_RUN_COUNT, histogram.count());
        Ok(fields)
    }

    fn extract_timer(&self, timer: &Timer) -> Result<FieldSet, ExtractionError> {
        let snapshot = timer.snapshot()?;
        let mut fields = FieldSet::with_capacity(15);
        push_distribution(&mut fields, &snapshot, self.duration_factor);
        self.push_rates(
            &mut fields,
            timer.one_minute_rate(),
            timer.five_minute_rate(),
            timer.fifteen_minute_rate(),
            timer.mean_rate(),
        );
        fields.push(FIELD_RUN_COUNT, timer.count());
        Ok(fields)
    }

    fn push_rates(&self, fields: &mut FieldSet, m1: f64, m5: f64, m15: f64, mean: f64) {
        fields.push(FIELD_ONE_MINUTE, m1 * self.rate_factor);
        fields.push(FIELD_FIVE_MINUTE, m5 * self.rate_factor);
        fields.push(FIELD_FIFTEEN_MINUTE, m15 * self.rate_factor);
        fields.push(FIELD_MEAN_MINUTE, mean * self.rate_factor);
    }
}

fn push_distribution(fields: &mut FieldSet, snapshot: &HistogramSnapshot, factor: f64) {
    fields.push(FIELD_COUNT, snapshot.size());
    fields.push(FIELD_MIN, snapshot.min() as f64 * factor);
    fields.push(FIELD_MAX, snapshot.max() as f64 * factor);
    fields.push(FIELD_MEAN, snapshot.mean() * factor);
    fields.push(FIELD_STD_DEV, snapshot.std_dev() * factor);
    fields.push(FIELD_P50, snapshot.median() as f64 * factor);
    fields.push(FIELD_P75, snapshot.p75() as f64 * factor);
    fields.push(FIELD_P95, snapshot.p95() as f64 * factor);
    fields.push(FIELD_P99, snapshot.p99() as f64 * factor);
    fields.push(FIELD_P999, snapshot.p999() as f64 * factor);
}
