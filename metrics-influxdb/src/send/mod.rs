/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::LineBatch;

mod console;
pub use console::ConsoleSender;

mod list;
pub use list::ListSender;

mod influxdb;
pub use influxdb::InfluxdbHttpSender;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to resolve {peer}: {source}")]
    Resolve { peer: String, source: io::Error },
    #[error("no address resolved for {0}")]
    NoAddress(String),
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("tls handshake failed: {0}")]
    Tls(io::Error),
    #[error("failed to write request: {0}")]
    Write(io::Error),
    #[error("failed to read response: {0}")]
    Read(io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("error response: {code} {detail}")]
    Status { code: u16, detail: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Delivers one batch of encoded lines.
///
/// Sending an empty batch is a no-op.
pub trait Sender: Send + Sync {
    fn send(&self, batch: &LineBatch) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// The senders selectable from configuration.
pub enum AnySender {
    Influxdb(InfluxdbHttpSender),
    Console(ConsoleSender),
}

impl Sender for AnySender {
    async fn send(&self, batch: &LineBatch) -> Result<(), SendError> {
        match self {
            AnySender::Influxdb(s) => s.send(batch).await,
            AnySender::Console(s) => s.send(batch).await,
        }
    }
}
