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

//! Connection acceptor
//!
//! Owns the listening socket. Every accepted transport goes through the
//! governor for an admission decision before any protocol work; rejected
//! peers see only a closed socket, with no bytes exchanged in either
//! direction. The accept loop never blocks on connection I/O.

use crate::connection::Connection;
use crate::context::ServerContext;
use crate::error::GatewayError;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Telnet connection acceptor
pub struct TelnetServer {
    context: ServerContext,
    listener: TcpListener,
}

impl TelnetServer {
    /// Bind the listening socket; returns once listening is active
    pub async fn bind(addr: SocketAddr, context: ServerContext) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        Ok(Self { context, listener })
    }

    /// The actual bound address, useful when binding port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown token fires
    ///
    /// Stopping the acceptor does not touch existing connections; draining
    /// them is the caller's affair. Transient accept errors keep the loop
    /// alive; a fatal listener error tears it down and surfaces upward.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), GatewayError> {
        tracing::info!("Telnet server accepting connections...");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Telnet server no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        match self.context.governor().admit(remote.ip()) {
                            Ok(()) => {
                                let connection = Connection::new(remote);
                                tracing::info!(
                                    connection = %connection.id(),
                                    remote = %remote,
                                    "connection admitted"
                                );
                                let context = self.context.clone();
                                tokio::spawn(connection.run(stream, context));
                            }
                            Err(reason) => {
                                // Close with no protocol exchange; the peer
                                // learns nothing about why
                                tracing::debug!(
                                    remote = %remote,
                                    "connection rejected: {}",
                                    reason
                                );
                                drop(stream);
                            }
                        }
                    }
                    Err(error) if is_transient(&error) => {
                        tracing::warn!("transient accept error: {}", error);
                    }
                    Err(error) => {
                        tracing::error!("fatal listener error: {}", error);
                        return Err(GatewayError::Transport(error));
                    }
                },
            }
        }
    }
}

/// Accept errors that do not condemn the listener
fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_error_classification() {
        assert!(is_transient(&std::io::Error::from(
            std::io::ErrorKind::ConnectionAborted
        )));
        assert!(is_transient(&std::io::Error::from(
            std::io::ErrorKind::WouldBlock
        )));
        assert!(!is_transient(&std::io::Error::from(
            std::io::ErrorKind::PermissionDenied
        )));
        assert!(!is_transient(&std::io::Error::from(
            std::io::ErrorKind::NotFound
        )));
    }
}
