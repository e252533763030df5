/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::Context;
use log::{debug, error, info, warn};

use metric_registry::MetricRegistry;

use metrics_influxdb::config::{AppConfig, SenderKind};
use metrics_influxdb::opts::ProcArgs;
use metrics_influxdb::report::Reporter;
use metrics_influxdb::runtime::ScheduledReporter;
use metrics_influxdb::send::{AnySender, ConsoleSender, InfluxdbHttpSender};

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        metrics_influxdb::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let _log_guard = metrics_influxdb::log::setup(proc_args.verbose_level)
        .context("failed to setup process logger")?;

    let config = metrics_influxdb::config::load(&proc_args.config_file)
        .context(format!("failed to load config, opts: {:?}", &proc_args))?;
    debug!("loaded config from {}", proc_args.config_file.display());

    if proc_args.test_config {
        info!("the format of the config file is ok");
        return Ok(());
    }

    let ret = tokio_run(&proc_args, config);
    match ret {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{e:?}");
            Err(e)
        }
    }
}

fn tokio_run(args: &ProcArgs, config: AppConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("metrics-report")
        .build()
        .context("failed to start runtime")?;
    rt.block_on(run(args, config))
}

fn build_sender(config: &AppConfig) -> anyhow::Result<AnySender> {
    match config.sender {
        SenderKind::Influxdb => {
            let sender = InfluxdbHttpSender::new(&config.influxdb)
                .context("failed to create influxdb sender")?;
            info!(
                "will write to {}://{}{}",
                config.influxdb.scheme.as_str(),
                config.influxdb.peer(),
                sender.api_path()
            );
            Ok(AnySender::Influxdb(sender))
        }
        SenderKind::Console => Ok(AnySender::Console(ConsoleSender::new())),
    }
}

async fn run(args: &ProcArgs, config: AppConfig) -> anyhow::Result<()> {
    let sender = build_sender(&config)?;

    let registry = Arc::new(MetricRegistry::new());
    let send_timer = metrics_influxdb::stat::register_send_timer(&registry)
        .context("failed to register send latency timer")?;

    let mut reporter = Reporter::new(&config.reporter, config.influxdb.precision, sender)
        .context("failed to create reporter")?;
    reporter.set_send_timer(send_timer);

    let scheduled = ScheduledReporter::new(
        Arc::new(reporter),
        registry.clone(),
        config.reporter.emit_interval,
    );
    metrics_influxdb::stat::register_stats(&registry, &scheduled.stats())
        .context("failed to register report stats")?;

    if args.once {
        let summary = scheduled.run_once().await?;
        info!(
            "reported {} points, {} metrics failed",
            summary.points,
            summary.failures.len()
        );
        return Ok(());
    }

    let handle = scheduled.spawn();
    info!(
        "reporting every {:?}, press Ctrl-C to quit",
        config.reporter.emit_interval
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for quit signal")?;
    info!("quit signal received");

    if !handle.shutdown(config.reporter.shutdown_grace).await {
        warn!("the last report cycle was abandoned");
    }
    Ok(())
}
