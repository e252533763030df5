/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use slog::{Drain, slog_o};
use slog_scope::GlobalLoggerGuard;

const PROCESS_LOG_THREAD_NAME: &str = "log-process";
const PROCESS_LOG_CHANNEL_SIZE: usize = 4096;

pub fn level_for_verbose(verbose_level: u8) -> ::log::Level {
    match verbose_level {
        0 => ::log::Level::Warn,
        1 => ::log::Level::Info,
        2 => ::log::Level::Debug,
        _ => ::log::Level::Trace,
    }
}

/// Route `log` records to stderr through an async slog drain.
///
/// The returned guard must be kept alive until the process exits.
pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, ::log::SetLoggerError> {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(PROCESS_LOG_CHANNEL_SIZE)
        .thread_name(PROCESS_LOG_THREAD_NAME.to_string())
        .build()
        .fuse();
    let logger = slog::Logger::root(drain, slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init_with_level(level_for_verbose(verbose_level))?;
    Ok(scope_guard)
}
