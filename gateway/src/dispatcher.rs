//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-connection outbound queue and writer task
//!
//! Concurrent producers (command responses, world events) enqueue rendered
//! bytes; a single writer task per connection drains the queue in FIFO order
//! so output is never interleaved mid-line. `enqueue` never blocks: when a
//! pathological producer outruns a slow consumer past the queue bound, the
//! oldest message is dropped and counted, and the overflow is visible in the
//! logs. A write failure evicts the owning connection.

use crate::error::DisconnectReason;
use crate::governor::ConnectionWatch;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

/// One unit of rendered output awaiting delivery
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub payload: Bytes,
    pub queued_at: DateTime<Utc>,
}

/// Bounded FIFO of outbound messages for one connection
pub struct OutboundQueue {
    messages: Mutex<VecDeque<OutboundMessage>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl OutboundQueue {
    /// Create a queue bounded at `capacity` messages
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    /// Append a message; never blocks the caller
    ///
    /// At capacity the oldest queued message is dropped and counted.
    pub fn enqueue(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        {
            let mut messages = match self.messages.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if messages.len() >= self.capacity {
                messages.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("outbound queue overflow, {} messages dropped so far", dropped);
            }
            messages.push_back(OutboundMessage {
                payload,
                queued_at: Utc::now(),
            });
        }
        self.notify.notify_one();
    }

    /// Messages dropped to overflow so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queued message count
    pub fn len(&self) -> usize {
        match self.messages.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every queued message, oldest first
    pub fn take_all(&self) -> Vec<OutboundMessage> {
        let mut messages = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.drain(..).collect()
    }

    fn pop(&self) -> Option<OutboundMessage> {
        match self.messages.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }

    /// Write everything queued, in order, then flush
    pub async fn drain_into<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(message) = self.pop() {
            writer.write_all(&message.payload).await?;
        }
        writer.flush().await
    }
}

/// Dedicated writer task for one connection
///
/// Suspends while the queue is empty and resumes on enqueue. On eviction it
/// makes one best-effort flush bounded by `grace`, and on a write failure it
/// evicts the connection so the reader transitions to `Closing`.
pub async fn run_writer<W>(
    queue: Arc<OutboundQueue>,
    mut writer: W,
    watch: Arc<ConnectionWatch>,
    grace: std::time::Duration,
) where
    W: AsyncWrite + Unpin,
{
    let token = watch.token();
    loop {
        if let Err(error) = queue.drain_into(&mut writer).await {
            tracing::debug!(
                connection = %watch.id(),
                remote = %watch.remote(),
                "outbound write failed: {}",
                error
            );
            watch.evict(DisconnectReason::TransportError);
            return;
        }

        tokio::select! {
            _ = token.cancelled() => {
                // Closing: flush whatever made it into the queue, bounded
                let _ = tokio::time::timeout(grace, queue.drain_into(&mut writer)).await;
                return;
            }
            _ = queue.notify.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::{GovernorLimits, ResourceGovernor};
    use std::net::IpAddr;
    use uuid::Uuid;

    fn test_watch() -> Arc<ConnectionWatch> {
        let governor = ResourceGovernor::new(GovernorLimits::default());
        governor.register(Uuid::new_v4(), IpAddr::from([127, 0, 0, 1]))
    }

    #[test]
    fn test_fifo_order() {
        let queue = OutboundQueue::new(16);
        queue.enqueue(b"first".to_vec());
        queue.enqueue(b"second".to_vec());
        queue.enqueue(b"third".to_vec());

        let drained = queue.take_all();
        let payloads: Vec<&[u8]> = drained.iter().map(|m| m.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"first" as &[u8], b"second", b"third"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest_and_counts() {
        let queue = OutboundQueue::new(3);
        for i in 0..5u8 {
            queue.enqueue(vec![i]);
        }

        assert_eq!(queue.dropped(), 2);
        let remaining: Vec<u8> = queue.take_all().iter().map(|m| m.payload[0]).collect();
        assert_eq!(remaining, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let queue = OutboundQueue::new(16);
        queue.enqueue(b"one ".to_vec());
        queue.enqueue(b"two ".to_vec());
        queue.enqueue(b"three".to_vec());

        let mut sink: Vec<u8> = Vec::new();
        queue.drain_into(&mut sink).await.unwrap();
        assert_eq!(sink, b"one two three");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_writer_drains_on_enqueue_and_exits_on_cancel() {
        let queue = OutboundQueue::new(16);
        let watch = test_watch();
        let (client, server) = tokio::io::duplex(1024);

        let writer = tokio::spawn(run_writer(
            Arc::clone(&queue),
            server,
            Arc::clone(&watch),
            std::time::Duration::from_millis(100),
        ));

        queue.enqueue(b"hello\r\n".to_vec());

        let mut buf = vec![0u8; 64];
        let mut client = client;
        use tokio::io::AsyncReadExt;
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello\r\n");

        watch.evict(DisconnectReason::Quit);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_flushes_pending_output_after_eviction() {
        let queue = OutboundQueue::new(16);
        let watch = test_watch();
        let (client, server) = tokio::io::duplex(1024);

        queue.enqueue(b"goodbye\r\n".to_vec());
        watch.evict(DisconnectReason::Quit);

        let writer = tokio::spawn(run_writer(
            Arc::clone(&queue),
            server,
            Arc::clone(&watch),
            std::time::Duration::from_millis(100),
        ));
        writer.await.unwrap();

        let mut buf = vec![0u8; 64];
        let mut client = client;
        use tokio::io::AsyncReadExt;
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"goodbye\r\n");
    }
}
