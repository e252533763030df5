/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{SendError, Sender};
use crate::protocol::LineBatch;

/// Keeps every sent line in memory, at most `capacity` of them.
///
/// Oldest lines are dropped first once the capacity is reached.
pub struct ListSender {
    capacity: usize,
    frames: Mutex<Vec<String>>,
    send_count: AtomicUsize,
}

impl ListSender {
    pub fn new(capacity: usize) -> Self {
        ListSender {
            capacity,
            frames: Mutex::new(Vec::new()),
            send_count: AtomicUsize::new(0),
        }
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `send` calls seen so far.
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sender for ListSender {
    async fn send(&self, batch: &LineBatch) -> Result<(), SendError> {
        self.send_count.fetch_add(1, Ordering::Relaxed);
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        frames.extend(batch.lines().map(String::from));
        if frames.len() > self.capacity {
            let extra = frames.len() - self.capacity;
            frames.drain(..extra);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capacity() {
        let sender = ListSender::new(2);
        let batch: LineBatch = ["a count=1i", "b count=2i", "c count=3i"]
            .into_iter()
            .map(String::from)
            .collect();
        sender.send(&batch).await.unwrap();
        assert_eq!(sender.send_count(), 1);
        assert_eq!(
            sender.frames(),
            vec!["b count=2i".to_string(), "c count=3i".to_string()]
        );

        sender.clear();
        assert!(sender.frames().is_empty());
    }
}
