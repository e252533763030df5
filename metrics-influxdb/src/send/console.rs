/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use tokio::io::AsyncWriteExt;

use super::{SendError, Sender};
use crate::protocol::LineBatch;

/// Prints every line to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSender {}

impl ConsoleSender {
    pub fn new() -> Self {
        ConsoleSender {}
    }
}

impl Sender for ConsoleSender {
    async fn send(&self, batch: &LineBatch) -> Result<(), SendError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&batch.to_body()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
