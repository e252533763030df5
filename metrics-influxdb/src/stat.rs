/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Instant;

use metric_registry::{Gauge, MetricRegistry, RegistryError, Timer};

use crate::runtime::ReportStats;

pub const METRIC_UPTIME: &str = "metrics_influxdb.uptime";
pub const METRIC_CYCLES: &str = "metrics_influxdb.report.cycles";
pub const METRIC_POINTS: &str = "metrics_influxdb.report.points";
pub const METRIC_DROPPED_BATCHES: &str = "metrics_influxdb.report.dropped_batches";
pub const METRIC_METRIC_ERRORS: &str = "metrics_influxdb.report.metric_errors";
pub const METRIC_SEND_LATENCY: &str = "metrics_influxdb.report.send_latency";

/// The timer a reporter records its send calls in.
pub fn register_send_timer(registry: &MetricRegistry) -> Result<Arc<Timer>, RegistryError> {
    registry.timer(METRIC_SEND_LATENCY)
}

/// Process uptime in seconds and the reporter's own counters, as gauges.
pub fn register_stats(
    registry: &MetricRegistry,
    stats: &Arc<ReportStats>,
) -> Result<(), RegistryError> {
    let started = Instant::now();
    registry.register_gauge(
        METRIC_UPTIME,
        Gauge::new(move || started.elapsed().as_secs()),
    )?;

    let s = stats.clone();
    registry.register_gauge(METRIC_CYCLES, Gauge::new(move || s.cycles()))?;
    let s = stats.clone();
    registry.register_gauge(METRIC_POINTS, Gauge::new(move || s.points()))?;
    let s = stats.clone();
    registry.register_gauge(
        METRIC_DROPPED_BATCHES,
        Gauge::new(move || s.dropped_batches()),
    )?;
    let s = stats.clone();
    registry.register_gauge(
        METRIC_METRIC_ERRORS,
        Gauge::new(move || s.metric_errors()),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metric_registry::GaugeValue;

    #[test]
    fn register() {
        let registry = MetricRegistry::new();
        let stats = Arc::new(ReportStats::default());
        register_stats(&registry, &stats).unwrap();
        register_send_timer(&registry).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.gauges.len(), 5);
        assert_eq!(snapshot.timers.len(), 1);
        assert_eq!(
            snapshot.gauges[METRIC_CYCLES].value(),
            Some(GaugeValue::Unsigned(0))
        );

        assert!(register_stats(&registry, &stats).is_err());
    }
}
