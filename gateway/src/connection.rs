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

//! Per-connection lifecycle
//!
//! One accepted transport stream gets exactly one reader task (this module)
//! and one writer task (the dispatcher). The reader owns the codec, the
//! session, and its handler; nothing here is shared with other connections,
//! so no per-connection state needs synchronization. The terminal state is
//! irreversible: once a connection starts closing it releases its governor
//! slot exactly once and is never reused.

use crate::context::ServerContext;
use crate::dispatcher::{run_writer, OutboundQueue};
use crate::error::DisconnectReason;
use crate::session::handler::{Flow, SessionHandler};
use crate::session::Session;
use crate::telnet::codec::TelnetCodec;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use uuid::Uuid;

/// One accepted transport connection
pub struct Connection {
    id: Uuid,
    remote: SocketAddr,
    accepted_at: DateTime<Utc>,
}

impl Connection {
    /// Create the identity for a freshly accepted stream
    pub fn new(remote: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            remote,
            accepted_at: Utc::now(),
        }
    }

    /// Connection id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remote peer address
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// When the transport was accepted
    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    /// Drive the connection until it closes
    ///
    /// The caller has already been admitted by the governor; this method owns
    /// the matching `release`.
    pub async fn run(self, stream: TcpStream, context: ServerContext) {
        let governor = context.governor().clone();
        let watch = governor.register(self.id, self.remote.ip());
        let token = watch.token();

        let queue = OutboundQueue::new(context.config().limits.outbound_queue_depth);
        let (mut read_half, write_half) = stream.into_split();
        let writer = tokio::spawn(run_writer(
            queue.clone(),
            write_half,
            watch.clone(),
            context.shutdown_grace(),
        ));

        let mut codec = TelnetCodec::new(context.config().limits.max_line_length);
        let mut handler = SessionHandler::new(
            Session::new(self.id, self.remote),
            context.clone(),
            queue.clone(),
        );
        handler.on_connect();

        let mut buf = vec![0u8; context.config().limits.max_packet_size];
        let reason = loop {
            let idle = context.idle_deadline(!handler.session().state.is_authenticated());

            let read = tokio::select! {
                _ = token.cancelled() => {
                    break watch
                        .eviction_reason()
                        .unwrap_or(DisconnectReason::ServerShutdown);
                }
                result = tokio::time::timeout(idle, read_half.read(&mut buf)) => result,
            };

            match read {
                // Read deadline expired without a byte from the peer
                Err(_elapsed) => break DisconnectReason::IdleTimeout,
                Ok(Ok(0)) => break DisconnectReason::PeerClosed,
                Ok(Ok(n)) => {
                    watch.touch(Utc::now());

                    if let Err(violation) = governor.validate_packet(&buf[..n]) {
                        handler.notify_violation(&violation);
                        continue;
                    }

                    let decoded = codec.decode(&buf[..n]);
                    let mut flow = Flow::Continue;
                    for event in decoded.events {
                        if let Flow::Close(r) = handler.on_event(event) {
                            flow = Flow::Close(r);
                            break;
                        }
                    }
                    if flow == Flow::Continue {
                        for line in decoded.lines {
                            if let Flow::Close(r) = handler.on_line(line).await {
                                flow = Flow::Close(r);
                                break;
                            }
                        }
                    }

                    if handler.session().state.is_authenticated() {
                        watch.mark_authenticated();
                    }

                    if let Flow::Close(r) = flow {
                        break r;
                    }
                }
                Ok(Err(error)) => {
                    tracing::debug!(
                        connection = %self.id,
                        remote = %self.remote,
                        "read failed: {}",
                        error
                    );
                    break DisconnectReason::TransportError;
                }
            }
        };

        // Closing: best-effort farewell, bounded flush, then release the
        // governor slot exactly once
        handler.notify_disconnect(reason);
        watch.evict(reason);
        let drain_deadline = context.shutdown_grace() + std::time::Duration::from_secs(1);
        let _ = tokio::time::timeout(drain_deadline, writer).await;

        if governor.unregister(self.id) {
            governor.release(self.remote.ip());
        }

        tracing::info!(
            connection = %self.id,
            remote = %self.remote,
            reason = %reason,
            "connection closed"
        );
    }
}
