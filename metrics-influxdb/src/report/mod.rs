/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use metric_registry::{Counter, Gauge, Histogram, Meter, MetricKind, MetricsSnapshot, Timer};

use crate::config::ReporterConfig;
use crate::extract::{ExtractionError, FieldExtractor, MetricRef};
use crate::protocol::{self, EncodeError, LineBatch, TimestampPrecision};
use crate::send::{SendError, Sender};
use crate::transform::{MeasurementTransformer, NoopTransformer, TransformError};
use crate::types::TagMap;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodeError),
}

/// A metric left out of the batch, and why.
#[derive(Debug, Error)]
#[error("{kind} {name}: {source}")]
pub struct MetricFailure {
    pub kind: MetricKind,
    pub name: String,
    #[source]
    pub source: MetricError,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("another report cycle is still running")]
    Busy,
    #[error("failed to send {points} points: {source}")]
    Send {
        points: usize,
        #[source]
        source: SendError,
    },
}

/// The outcome of a finished cycle.
#[derive(Debug, Default)]
pub struct ReportSummary {
    pub points: usize,
    pub failures: Vec<MetricFailure>,
}

impl ReportSummary {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points == 0
    }
}

/// Turns one snapshot of metrics into a line batch and hands it to the sender.
///
/// Cycles never overlap: a cycle started while another one is running fails
/// with [`ReportError::Busy`].
pub struct Reporter<S> {
    sender: S,
    transformer: Box<dyn MeasurementTransformer>,
    extractor: FieldExtractor,
    global_tags: TagMap,
    precision: Option<TimestampPrecision>,
    send_timer: Option<Arc<Timer>>,
    cycle: Mutex<()>,
}

impl<S: Sender> Reporter<S> {
    /// `precision` is the one the sender declares to the server, it is
    /// ignored when timestamps are disabled in `config`.
    pub fn new(
        config: &ReporterConfig,
        precision: TimestampPrecision,
        sender: S,
    ) -> anyhow::Result<Self> {
        let transformer = config.build_transformer()?;
        Ok(Reporter {
            sender,
            transformer,
            extractor: FieldExtractor::new(config.rate_unit, config.duration_unit),
            global_tags: config.tags.clone(),
            precision: config.timestamp.then_some(precision),
            send_timer: None,
            cycle: Mutex::new(()),
        })
    }

    /// A reporter with default units, no global tags and no timestamps.
    pub fn with_sender(sender: S) -> Self {
        let config = ReporterConfig::default();
        Reporter {
            sender,
            transformer: Box::new(NoopTransformer),
            extractor: FieldExtractor::new(config.rate_unit, config.duration_unit),
            global_tags: TagMap::new(),
            precision: None,
            send_timer: None,
            cycle: Mutex::new(()),
        }
    }

    pub fn set_transformer<T>(&mut self, transformer: T)
    where
        T: MeasurementTransformer + 'static,
    {
        self.transformer = Box::new(transformer);
    }

    pub fn set_global_tags(&mut self, tags: TagMap) {
        self.global_tags = tags;
    }

    /// Record the duration of every sender call in `timer`.
    pub fn set_send_timer(&mut self, timer: Arc<Timer>) {
        self.send_timer = Some(timer);
    }

    #[inline]
    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub async fn report_snapshot(
        &self,
        snapshot: &MetricsSnapshot,
    ) -> Result<ReportSummary, ReportError> {
        self.report(
            &snapshot.gauges,
            &snapshot.counters,
            &snapshot.histograms,
            &snapshot.meters,
            &snapshot.timers,
        )
        .await
    }

    pub async fn report(
        &self,
        gauges: &BTreeMap<String, Arc<Gauge>>,
        counters: &BTreeMap<String, Arc<Counter>>,
        histograms: &BTreeMap<String, Arc<Histogram>>,
        meters: &BTreeMap<String, Arc<Meter>>,
        timers: &BTreeMap<String, Arc<Timer>>,
    ) -> Result<ReportSummary, ReportError> {
        self.report_at(Utc::now(), gauges, counters, histograms, meters, timers)
            .await
    }

    /// Run one cycle with `time` as the timestamp shared by every point.
    pub async fn report_at(
        &self,
        time: DateTime<Utc>,
        gauges: &BTreeMap<String, Arc<Gauge>>,
        counters: &BTreeMap<String, Arc<Counter>>,
        histograms: &BTreeMap<String, Arc<Histogram>>,
        meters: &BTreeMap<String, Arc<Meter>>,
        timers: &BTreeMap<String, Arc<Timer>>,
    ) -> Result<ReportSummary, ReportError> {
        let Ok(_guard) = self.cycle.try_lock() else {
            return Err(ReportError::Busy);
        };

        let (batch, failures) =
            self.build_batch(time, gauges, counters, histograms, meters, timers);
        for failure in &failures {
            warn!("metric skipped: {failure}");
        }

        if batch.is_empty() {
            debug!("nothing to report, {} metrics failed", failures.len());
            return Ok(ReportSummary {
                points: 0,
                failures,
            });
        }

        let points = batch.len();
        let r = match &self.send_timer {
            Some(timer) => {
                let ctx = timer.time();
                let r = self.sender.send(&batch).await;
                ctx.stop();
                r
            }
            None => self.sender.send(&batch).await,
        };
        match r {
            Ok(_) => {
                debug!("reported {points} points, {} metrics failed", failures.len());
                Ok(ReportSummary { points, failures })
            }
            Err(e) => {
                warn!("dropped batch of {points} points: {e}");
                Err(ReportError::Send { points, source: e })
            }
        }
    }

    /// Encode every metric in the fixed kind order, sorted by name within a
    /// kind. Failing metrics are collected instead of ending the cycle.
    pub fn build_batch(
        &self,
        time: DateTime<Utc>,
        gauges: &BTreeMap<String, Arc<Gauge>>,
        counters: &BTreeMap<String, Arc<Counter>>,
        histograms: &BTreeMap<String, Arc<Histogram>>,
        meters: &BTreeMap<String, Arc<Meter>>,
        timers: &BTreeMap<String, Arc<Timer>>,
    ) -> (LineBatch, Vec<MetricFailure>) {
        let timestamp = self.precision.and_then(|p| p.timestamp(&time));
        let mut batch = LineBatch::new();
        let mut failures = Vec::new();

        let mut add = |name: &str, metric: MetricRef<'_>| {
            match self.encode_metric(name, metric, timestamp) {
                Ok(Some(line)) => batch.push(line),
                Ok(None) => debug!("{} {name} has no value this cycle", metric.kind()),
                Err(source) => failures.push(MetricFailure {
                    kind: metric.kind(),
                    name: name.to_string(),
                    source,
                }),
            }
        };

        for (name, gauge) in gauges {
            add(name, MetricRef::Gauge(gauge));
        }
        for (name, counter) in counters {
            add(name, MetricRef::Counter(counter));
        }
        for (name, histogram) in histograms {
            add(name, MetricRef::Histogram(histogram));
        }
        for (name, meter) in meters {
            add(name, MetricRef::Meter(meter));
        }
        for (name, timer) in timers {
            add(name, MetricRef::Timer(timer));
        }

        (batch, failures)
    }

    fn encode_metric(
        &self,
        name: &str,
        metric: MetricRef<'_>,
        timestamp: Option<i64>,
    ) -> Result<Option<String>, MetricError> {
        let measurement = self.transformer.transform(name)?;
        if measurement.name.is_empty() {
            return Err(TransformError::NoMeasurement(name.to_string()).into());
        }
        let Some(fields) = self.extractor.extract(metric)? else {
            return Ok(None);
        };
        let tags = if measurement.tags.is_empty() {
            self.global_tags.clone()
        } else {
            self.global_tags.merged(&measurement.tags)
        };
        let line = protocol::encode(&measurement.name, &tags, &fields, timestamp)?;
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::TimeZone;
    use metric_registry::MetricRegistry;

    use crate::send::ListSender;
    use crate::transform::{Measurement, TemplateTransformer};

    fn reporter() -> Reporter<ListSender> {
        Reporter::with_sender(ListSender::new(100))
    }

    fn field_keys(line: &str) -> Vec<&str> {
        let fields = line.split(' ').nth(1).unwrap();
        fields
            .split(',')
            .map(|kv| kv.split_once('=').unwrap().0)
            .collect()
    }

    const METER_KEYS: [&str; 5] = [
        "count",
        "one-minute",
        "five-minute",
        "fifteen-minute",
        "mean-minute",
    ];

    const HISTOGRAM_KEYS: [&str; 11] = [
        "count",
        "min",
        "max",
        "mean",
        "std-dev",
        "50-percentile",
        "75-percentile",
        "95-percentile",
        "99-percentile",
        "999-percentile",
        "run-count",
    ];

    #[tokio::test]
    async fn counter() {
        let registry = MetricRegistry::new();
        registry.counter("counter").unwrap().inc();

        let reporter = reporter();
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();
        assert_eq!(summary.points, 1);

        let frames = reporter.sender().frames();
        assert_eq!(frames, vec!["counter count=1i".to_string()]);
    }

    #[tokio::test]
    async fn gauge() {
        let registry = MetricRegistry::new();
        registry
            .register_gauge("gauge", Gauge::new(|| 0i32))
            .unwrap();

        let reporter = reporter();
        reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        let frames = reporter.sender().frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("value=0i"));
    }

    #[tokio::test]
    async fn absent_gauge() {
        let registry = MetricRegistry::new();
        registry
            .register_gauge("idle", Gauge::optional(|| None::<u64>))
            .unwrap();
        registry.counter("c").unwrap();

        let reporter = reporter();
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();
        assert_eq!(summary.points, 1);
        assert!(summary.failures.is_empty());
        assert_eq!(reporter.sender().frames(), vec!["c count=0i".to_string()]);
    }

    #[tokio::test]
    async fn meter() {
        let registry = MetricRegistry::new();
        registry.meter("meter").unwrap().mark();

        let reporter = reporter();
        reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        let frames = reporter.sender().frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("meter "));
        assert!(frames[0].contains("count=1i"));
        assert_eq!(field_keys(&frames[0]), METER_KEYS);
    }

    #[tokio::test]
    async fn histogram() {
        let registry = MetricRegistry::new();
        registry.histogram("histogram").unwrap().update(1);

        let reporter = reporter();
        reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        let frames = reporter.sender().frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains(" count=1i,"));
        assert!(frames[0].contains("run-count=1i"));
        assert_eq!(field_keys(&frames[0]), HISTOGRAM_KEYS);
    }

    #[tokio::test]
    async fn timer() {
        let registry = MetricRegistry::new();
        let timer = registry.timer("timer").unwrap();
        timer.time_fn(|| std::thread::sleep(Duration::from_millis(1)));

        let reporter = reporter();
        reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        let frames = reporter.sender().frames();
        assert_eq!(frames.len(), 1);
        let keys = field_keys(&frames[0]);
        for key in METER_KEYS.iter().chain(HISTOGRAM_KEYS.iter()) {
            assert_eq!(
                keys.iter().filter(|k| *k == key).count(),
                1,
                "field {key} in {}",
                frames[0]
            );
        }
    }

    #[tokio::test]
    async fn empty() {
        let reporter = reporter();
        let summary = reporter
            .report_snapshot(&MetricsSnapshot::default())
            .await
            .unwrap();
        assert!(summary.is_empty());
        assert_eq!(reporter.sender().send_count(), 0);
    }

    #[tokio::test]
    async fn kind_and_name_order() {
        let registry = MetricRegistry::new();
        registry.timer("a.timer").unwrap().update(Duration::from_millis(3));
        registry.meter("b.meter").unwrap().mark();
        registry.histogram("c.histogram").unwrap().update(5);
        registry.counter("z.counter").unwrap().inc();
        registry.counter("d.counter").unwrap().inc();
        registry
            .register_gauge("e.gauge", Gauge::new(|| 1.5f64))
            .unwrap();

        let reporter = reporter();
        let snapshot = registry.snapshot();
        reporter.report_snapshot(&snapshot).await.unwrap();
        let first = reporter.sender().frames();
        let names: Vec<&str> = first
            .iter()
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "e.gauge",
                "d.counter",
                "z.counter",
                "c.histogram",
                "b.meter",
                "a.timer"
            ]
        );

        reporter.sender().clear();
        reporter.report_snapshot(&snapshot).await.unwrap();
        let second = reporter.sender().frames();
        let second_names: Vec<&str> = second
            .iter()
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(names, second_names);
    }

    #[tokio::test]
    async fn transform_failure_isolated() {
        let registry = MetricRegistry::new();
        registry.counter("bad").unwrap().inc();
        registry.counter("good").unwrap().inc();

        let mut reporter = reporter();
        reporter.set_transformer(|name: &str| {
            if name == "bad" {
                Err(TransformError::Other("rejected".to_string()))
            } else {
                Ok(Measurement::new(name))
            }
        });
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        assert_eq!(summary.points, 1);
        assert_eq!(summary.failures.len(), 1);
        let failure = &summary.failures[0];
        assert_eq!(failure.kind, MetricKind::Counter);
        assert_eq!(failure.name, "bad");
        assert!(matches!(failure.source, MetricError::Transform(_)));
        assert_eq!(reporter.sender().frames(), vec!["good count=1i".to_string()]);
    }

    #[tokio::test]
    async fn extraction_failure_isolated() {
        let registry = MetricRegistry::new();
        registry.counter("requests").unwrap().inc();
        let h = registry.histogram("latency").unwrap();
        h.update(1);
        h.poison();
        registry.timer("query").unwrap().poison();

        let reporter = reporter();
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();

        assert_eq!(summary.points, 1);
        assert_eq!(summary.failures.len(), 2);
        for (kind, name) in [(MetricKind::Histogram, "latency"), (MetricKind::Timer, "query")] {
            let failure = summary
                .failures
                .iter()
                .find(|f| f.name == name)
                .unwrap();
            assert_eq!(failure.kind, kind);
            assert!(matches!(failure.source, MetricError::Extraction(_)));
        }
        assert_eq!(
            reporter.sender().frames(),
            vec!["requests count=1i".to_string()]
        );
    }

    #[tokio::test]
    async fn encode_failure_isolated() {
        let registry = MetricRegistry::new();
        registry
            .register_gauge("nan", Gauge::new(|| f64::NAN))
            .unwrap();
        registry.counter("ok").unwrap().inc();

        let reporter = reporter();
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();
        assert_eq!(summary.points, 1);
        assert!(matches!(
            summary.failures[0].source,
            MetricError::Encoding(EncodeError::NoFields)
        ));
    }

    #[tokio::test]
    async fn tags_and_timestamp() {
        let registry = MetricRegistry::new();
        registry.counter("web1.requests").unwrap().inc_by(3);

        let mut config = ReporterConfig::new();
        config.tags = [("host", "default"), ("dc", "eu")].into_iter().collect();
        config.template = Some("host.measurement".to_string());
        let reporter = Reporter::new(
            &config,
            TimestampPrecision::Seconds,
            ListSender::new(100),
        )
        .unwrap();

        let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let snapshot = registry.snapshot();
        reporter
            .report_at(
                time,
                &snapshot.gauges,
                &snapshot.counters,
                &snapshot.histograms,
                &snapshot.meters,
                &snapshot.timers,
            )
            .await
            .unwrap();

        assert_eq!(
            reporter.sender().frames(),
            vec!["requests,dc=eu,host=web1 count=3i 1700000000".to_string()]
        );
    }

    #[tokio::test]
    async fn template_mismatch() {
        let registry = MetricRegistry::new();
        registry.counter("flat").unwrap().inc();

        let mut reporter = reporter();
        reporter.set_transformer(TemplateTransformer::new("host.measurement").unwrap());
        let summary = reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(reporter.sender().send_count(), 0);
    }

    struct FailingSender;

    impl Sender for FailingSender {
        async fn send(&self, _batch: &LineBatch) -> Result<(), SendError> {
            Err(SendError::Status {
                code: 500,
                detail: "internal".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn send_failure() {
        let registry = MetricRegistry::new();
        registry.counter("c").unwrap().inc();

        let reporter = Reporter::with_sender(FailingSender);
        let r = reporter.report_snapshot(&registry.snapshot()).await;
        match r {
            Err(ReportError::Send { points, source }) => {
                assert_eq!(points, 1);
                assert!(matches!(source, SendError::Status { code: 500, .. }));
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[tokio::test]
    async fn busy() {
        let reporter = reporter();
        let _guard = reporter.cycle.try_lock().unwrap();
        let r = reporter.report_snapshot(&MetricsSnapshot::default()).await;
        assert!(matches!(r, Err(ReportError::Busy)));
    }

    #[tokio::test]
    async fn send_timer() {
        let registry = MetricRegistry::new();
        registry.counter("c").unwrap().inc();

        let timer = Arc::new(Timer::new().unwrap());
        let mut reporter = reporter();
        reporter.set_send_timer(timer.clone());
        reporter
            .report_snapshot(&registry.snapshot())
            .await
            .unwrap();
        assert_eq!(timer.count(), 1);
    }
}
