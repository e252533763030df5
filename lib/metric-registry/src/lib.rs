/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod clock;
pub use clock::{Clock, ManualClock, MonotonicClock};

mod counter;
pub use counter::Counter;

mod gauge;
pub use gauge::{Gauge, GaugeValue};

mod ewma;
pub use ewma::Ewma;

mod meter;
pub use meter::Meter;

mod histogram;
pub use histogram::{Histogram, HistogramSnapshot, SnapshotError};

mod timer;
pub use timer::{Timer, TimerContext};

mod registry;
pub use registry::{MetricKind, MetricRegistry, MetricsSnapshot, RegistryError};
