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

//! Admission control exercised over real TCP sockets

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thornvale_gateway::banner::BannerSet;
use thornvale_gateway::config::{Configuration, LimitsConfig};
use thornvale_gateway::directory::MemoryAccountDirectory;
use thornvale_gateway::governor::{GovernorLimits, ResourceGovernor};
use thornvale_gateway::server::TelnetServer;
use thornvale_gateway::shell::{EchoShell, NameForge};
use thornvale_gateway::ServerContext;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

async fn start_server(
    config: Configuration,
) -> (SocketAddr, CancellationToken, Arc<ResourceGovernor>) {
    let config = Arc::new(config);
    let governor = Arc::new(ResourceGovernor::new(GovernorLimits::from_config(&config)));
    let context = ServerContext::new(
        config,
        Arc::clone(&governor),
        Arc::new(MemoryAccountDirectory::new()),
        Arc::new(NameForge),
        Arc::new(EchoShell),
        Arc::new(BannerSet::default()),
    );

    let server = TelnetServer::bind("127.0.0.1:0".parse().unwrap(), context)
        .await
        .expect("bind failed");
    let addr = server.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(token).await;
    });

    (addr, shutdown, governor)
}

/// Read until the welcome banner arrives
async fn expect_banner(stream: &mut TcpStream) {
    let needle: &[u8] = b"T H O R N V A L E";
    let mut collected = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        if collected.windows(needle.len()).any(|w| w == needle) {
            return;
        }
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for banner")
            .expect("read failed");
        assert!(n > 0, "connection closed before the banner");
        collected.extend_from_slice(&buf[..n]);
    }
}

/// Read until the server closes the connection without sending anything
async fn expect_silent_close(stream: &mut TcpStream) {
    let mut buf = [0u8; 1024];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for close")
            .expect("read failed");
        if n == 0 {
            return;
        }
        // No partial protocol exchange is allowed on rejection
        panic!("rejected connection received {} bytes", n);
    }
}

async fn wait_for_open(governor: &ResourceGovernor, expected: usize) {
    for _ in 0..100 {
        if governor.open_connections() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "governor never settled at {} open connections (currently {})",
        expected,
        governor.open_connections()
    );
}

fn small_ceiling_config() -> Configuration {
    Configuration {
        limits: LimitsConfig {
            max_per_address: 2,
            rate_max_attempts: 100,
            ..LimitsConfig::default()
        },
        ..Configuration::default()
    }
}

#[tokio::test]
async fn test_per_address_ceiling_closes_excess_silently() {
    let (addr, _shutdown, governor) = start_server(small_ceiling_config()).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut first).await;
    let mut second = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut second).await;
    assert_eq!(governor.open_connections(), 2);

    // Third from the same address: closed with no bytes exchanged
    let mut third = TcpStream::connect(addr).await.unwrap();
    expect_silent_close(&mut third).await;

    // The admitted connections are untouched
    assert_eq!(governor.open_connections(), 2);
}

#[tokio::test]
async fn test_slot_freed_after_disconnect() {
    let (addr, _shutdown, governor) = start_server(small_ceiling_config()).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut first).await;
    let mut second = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut second).await;
    wait_for_open(&governor, 2).await;

    // Hang up one admitted connection and wait for its release
    drop(first);
    wait_for_open(&governor, 1).await;

    let mut fourth = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut fourth).await;
    wait_for_open(&governor, 2).await;
}

#[tokio::test]
async fn test_stop_accepting_leaves_existing_connections_alive() {
    let (addr, shutdown, governor) = start_server(small_ceiling_config()).await;

    let mut existing = TcpStream::connect(addr).await.unwrap();
    expect_banner(&mut existing).await;
    wait_for_open(&governor, 1).await;

    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // New connections are refused once the listener is gone
    assert!(TcpStream::connect(addr).await.is_err());

    // The existing connection was not forcibly closed
    assert_eq!(governor.open_connections(), 1);
}
