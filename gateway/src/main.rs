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

use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use thornvale_gateway::banner::BannerSet;
use thornvale_gateway::config::{Arguments, Configuration};
use thornvale_gateway::directory::MemoryAccountDirectory;
use thornvale_gateway::error::DisconnectReason;
use thornvale_gateway::governor::{GovernorLimits, ResourceGovernor};
use thornvale_gateway::server::TelnetServer;
use thornvale_gateway::shell::{EchoShell, NameForge};
use thornvale_gateway::ServerContext;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration, fail-fast on anything invalid
    let config: Configuration = Configuration::load(&arguments.config_file)
        .inspect_err(|err| eprintln!("Configuration load error: {}", err))
        .expect("Unable to load configuration file");

    debug!("Configuration loaded: {:?}", config);
    info!("Starting Thornvale Gateway...");

    let banners = Arc::new(BannerSet::load(config.banners.as_ref()));
    let governor = Arc::new(ResourceGovernor::new(GovernorLimits::from_config(&config)));

    // Stand-in collaborators; a deployment wires these to the world server
    let directory = Arc::new(MemoryAccountDirectory::new());
    let forge = Arc::new(NameForge);
    let engine = Arc::new(EchoShell);

    let bind_addr = config.telnet.addr.to_addr();
    let sweep_interval =
        tokio::time::Duration::from_secs(config.timeouts.sweep_interval_seconds);
    let grace = tokio::time::Duration::from_secs(config.timeouts.shutdown_grace_seconds);

    let context = ServerContext::new(
        Arc::new(config),
        Arc::clone(&governor),
        directory,
        forge,
        engine,
        banners,
    );

    let shutdown = CancellationToken::new();

    // Periodic stale-connection sweep
    let sweep_governor = Arc::clone(&governor);
    let sweep_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            tokio::select! {
                _ = sweep_shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let report = sweep_governor.sweep_stale(Utc::now());
                    if report.idle > 0 || report.slow > 0 {
                        tracing::info!(
                            "sweep evicted {} idle and {} slow connections",
                            report.idle,
                            report.slow
                        );
                    }
                }
            }
        }
    });

    // Bind errors are the one startup failure fatal to the process
    let server = TelnetServer::bind(bind_addr, context)
        .await
        .expect("Unable to bind telnet port");

    info!("Telnet server listening on {}", bind_addr);

    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_shutdown).await {
            tracing::error!("Telnet server error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    info!("Shutting down Thornvale Gateway...");
    shutdown.cancel();
    let evicted = governor.evict_all(DisconnectReason::ServerShutdown);
    if evicted > 0 {
        info!("Draining {} connections...", evicted);
    }
    tokio::time::sleep(grace).await;

    let _ = server_handle.await;
    info!("Goodnight.");
}
