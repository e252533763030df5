/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use metric_registry::MetricRegistry;

use crate::report::{ReportError, ReportSummary, Reporter};
use crate::send::Sender;

/// Counters over every cycle run by a [`ScheduledReporter`].
#[derive(Debug, Default)]
pub struct ReportStats {
    cycles: AtomicU64,
    points: AtomicU64,
    dropped_batches: AtomicU64,
    metric_errors: AtomicU64,
    busy: AtomicU64,
}

impl ReportStats {
    fn add_result(&self, r: &Result<ReportSummary, ReportError>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match r {
            Ok(summary) => {
                self.points
                    .fetch_add(summary.points as u64, Ordering::Relaxed);
                self.metric_errors
                    .fetch_add(summary.failures.len() as u64, Ordering::Relaxed);
            }
            Err(ReportError::Busy) => {
                self.busy.fetch_add(1, Ordering::Relaxed);
            }
            Err(ReportError::Send { .. }) => {
                self.dropped_batches.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn points(&self) -> u64 {
        self.points.load(Ordering::Relaxed)
    }

    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches.load(Ordering::Relaxed)
    }

    pub fn metric_errors(&self) -> u64 {
        self.metric_errors.load(Ordering::Relaxed)
    }

    pub fn busy(&self) -> u64 {
        self.busy.load(Ordering::Relaxed)
    }
}

/// Runs a reporter over a registry once per period.
pub struct ScheduledReporter<S> {
    reporter: Arc<Reporter<S>>,
    registry: Arc<MetricRegistry>,
    period: Duration,
    stats: Arc<ReportStats>,
}

impl<S: Sender + 'static> ScheduledReporter<S> {
    pub fn new(reporter: Arc<Reporter<S>>, registry: Arc<MetricRegistry>, period: Duration) -> Self {
        ScheduledReporter {
            reporter,
            registry,
            period,
            stats: Arc::new(ReportStats::default()),
        }
    }

    #[inline]
    pub fn stats(&self) -> Arc<ReportStats> {
        self.stats.clone()
    }

    /// Report the current registry content once.
    pub async fn run_once(&self) -> Result<ReportSummary, ReportError> {
        let snapshot = self.registry.snapshot();
        let r = self.reporter.report_snapshot(&snapshot).await;
        self.stats.add_result(&r);
        r
    }

    /// The first cycle runs one period after the spawn.
    pub fn spawn(self) -> ReporterHandle {
        let (trigger_sender, trigger_receiver) = mpsc::channel(1);
        let (quit_sender, quit_receiver) = watch::channel(false);
        let stats = self.stats.clone();
        let join = tokio::spawn(self.into_running(trigger_receiver, quit_receiver));
        ReporterHandle {
            trigger: trigger_sender,
            quit: quit_sender,
            join,
            stats,
        }
    }

    async fn into_running(
        self,
        mut trigger: mpsc::Receiver<()>,
        mut quit: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("scheduled reporter started, period {:?}", self.period);

        loop {
            tokio::select! {
                biased;

                _ = quit.changed() => {
                    // flush what has been recorded since the last cycle
                    let _ = self.run_once().await;
                    break;
                }
                _ = interval.tick() => {
                    let _ = self.run_once().await;
                }
                Some(_) = trigger.recv() => {
                    let _ = self.run_once().await;
                }
            }
        }

        info!(
            "scheduled reporter stopped after {} cycles, {} points sent",
            self.stats.cycles(),
            self.stats.points()
        );
    }
}

/// Controls a spawned [`ScheduledReporter`].
///
/// Dropping the handle stops the reporter after one last cycle.
pub struct ReporterHandle {
    trigger: mpsc::Sender<()>,
    quit: watch::Sender<bool>,
    join: JoinHandle<()>,
    stats: Arc<ReportStats>,
}

impl ReporterHandle {
    /// Ask for an extra cycle. Returns false if one is already pending or the
    /// reporter has stopped.
    pub fn report_now(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }

    #[inline]
    pub fn stats(&self) -> &Arc<ReportStats> {
        &self.stats
    }

    /// Stop the reporter after a final cycle, abandoning it if it takes more
    /// than `grace`. Returns true if it stopped in time.
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        let _ = self.quit.send(true);
        match tokio::time::timeout(grace, &mut self.join).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("scheduled reporter task failed: {e}");
                false
            }
            Err(_) => {
                warn!("scheduled reporter did not stop within {grace:?}, abandon it");
                self.join.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::LineBatch;
    use crate::send::{ListSender, SendError};
    use crate::transform::{Measurement, TransformError};

    fn setup(period: Duration) -> (Arc<Reporter<ListSender>>, Arc<MetricRegistry>, ReporterHandle) {
        let registry = Arc::new(MetricRegistry::new());
        registry.counter("requests").unwrap().inc();
        let reporter = Arc::new(Reporter::with_sender(ListSender::new(100)));
        let handle = ScheduledReporter::new(reporter.clone(), registry.clone(), period).spawn();
        (reporter, registry, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn periodic() {
        let (reporter, _registry, handle) = setup(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(reporter.sender().send_count(), 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(reporter.sender().send_count(), 2);
        assert_eq!(handle.stats().cycles(), 2);
        assert_eq!(handle.stats().points(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn report_now() {
        let (reporter, registry, handle) = setup(Duration::from_secs(3600));

        registry.counter("requests").unwrap().inc();
        assert!(handle.report_now());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(reporter.sender().send_count(), 1);
        assert_eq!(
            reporter.sender().frames(),
            vec!["requests count=2i".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flush() {
        let (reporter, _registry, handle) = setup(Duration::from_secs(3600));

        let stats = handle.stats().clone();
        assert!(handle.shutdown(Duration::from_secs(1)).await);
        assert_eq!(reporter.sender().send_count(), 1);
        assert_eq!(stats.cycles(), 1);
    }

    struct StuckSender;

    impl Sender for StuckSender {
        async fn send(&self, _batch: &LineBatch) -> Result<(), SendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandon() {
        let registry = Arc::new(MetricRegistry::new());
        registry.counter("requests").unwrap().inc();
        let reporter = Arc::new(Reporter::with_sender(StuckSender));
        let handle = ScheduledReporter::new(reporter, registry, Duration::from_secs(3600)).spawn();

        assert!(handle.report_now());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.shutdown(Duration::from_secs(1)).await);
    }

    struct FailingSender;

    impl Sender for FailingSender {
        async fn send(&self, _batch: &LineBatch) -> Result<(), SendError> {
            Err(SendError::Timeout(Duration::from_secs(1)))
        }
    }

    #[tokio::test]
    async fn stats() {
        let registry = Arc::new(MetricRegistry::new());
        registry.counter("bad").unwrap().inc();
        registry.counter("good").unwrap().inc();

        let mut reporter = Reporter::with_sender(ListSender::new(100));
        reporter.set_transformer(|name: &str| {
            if name == "bad" {
                Err(TransformError::Other("rejected".to_string()))
            } else {
                Ok(Measurement::new(name))
            }
        });
        let scheduled =
            ScheduledReporter::new(Arc::new(reporter), registry.clone(), Duration::from_secs(1));
        let summary = scheduled.run_once().await.unwrap();
        assert_eq!(summary.points, 1);
        let stats = scheduled.stats();
        assert_eq!(stats.metric_errors(), 1);
        assert_eq!(stats.points(), 1);

        let failing = ScheduledReporter::new(
            Arc::new(Reporter::with_sender(FailingSender)),
            registry,
            Duration::from_secs(1),
        );
        assert!(failing.run_once().await.is_err());
        assert_eq!(failing.stats().dropped_batches(), 1);
        assert_eq!(failing.stats().cycles(), 1);
    }
}
