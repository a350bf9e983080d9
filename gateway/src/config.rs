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

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "gateway/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "gateway/.env"
    )]
    pub env_file: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub telnet: TelnetConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    pub banners: Option<BannersConfig>,
}

impl Configuration {
    /// Load and validate configuration from a YAML file
    pub fn load(path: &str) -> Result<Self, String> {
        tracing::debug!("Loading configuration from file: {}", path);
        let file =
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let conf: Configuration = serde_yaml::from_reader(file)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        conf.validate()?;

        Ok(conf)
    }

    /// Validate limits and timeouts, fail-fast before anything binds
    pub fn validate(&self) -> Result<(), String> {
        self.limits.validate()?;
        self.timeouts.validate()?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TelnetConfig {
    pub addr: EnvField<TelnetBinding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelnetBinding(SocketAddr);

impl TelnetBinding {
    pub fn to_addr(&self) -> SocketAddr {
        self.0
    }
    pub fn to_ip(&self) -> IpAddr {
        self.0.ip()
    }
    pub fn to_port(&self) -> u16 {
        self.0.port()
    }
}

impl FromStr for TelnetBinding {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(SocketAddr::from_str(s)?))
    }
}

impl Default for TelnetBinding {
    fn default() -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            4000,
        )))
    }
}

impl std::fmt::Display for TelnetBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Admission-control and input-size ceilings
#[derive(Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Global open-connection ceiling
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Open-connection ceiling per source address
    #[serde(default = "default_max_per_address")]
    pub max_per_address: usize,

    /// Sliding rate window, in seconds
    #[serde(default = "default_rate_window_seconds")]
    pub rate_window_seconds: u64,

    /// Connection attempts tolerated per address within the window
    #[serde(default = "default_rate_max_attempts")]
    pub rate_max_attempts: usize,

    /// Maximum accepted input line, in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Maximum single transport read, in bytes
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,

    /// Outbound queue depth per connection before drop-oldest kicks in
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
}

impl LimitsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("limits.max_connections must be positive".to_string());
        }
        if self.max_per_address == 0 || self.max_per_address > self.max_connections {
            return Err(
                "limits.max_per_address must be positive and no greater than max_connections"
                    .to_string(),
            );
        }
        if self.rate_window_seconds == 0 || self.rate_max_attempts == 0 {
            return Err("limits.rate window and attempt threshold must be positive".to_string());
        }
        if self.max_line_length < 80 {
            return Err("limits.max_line_length must be at least 80".to_string());
        }
        if self.max_packet_size < self.max_line_length {
            return Err("limits.max_packet_size must cover at least one full line".to_string());
        }
        if self.outbound_queue_depth == 0 {
            return Err("limits.outbound_queue_depth must be positive".to_string());
        }
        Ok(())
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_max_per_address() -> usize {
    10
}

fn default_rate_window_seconds() -> u64 {
    60
}

fn default_rate_max_attempts() -> usize {
    20
}

fn default_max_line_length() -> usize {
    1024
}

fn default_max_packet_size() -> usize {
    4096
}

fn default_outbound_queue_depth() -> usize {
    256
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_connections: default_max_connections(),
            max_per_address: default_max_per_address(),
            rate_window_seconds: default_rate_window_seconds(),
            rate_max_attempts: default_rate_max_attempts(),
            max_line_length: default_max_line_length(),
            max_packet_size: default_max_packet_size(),
            outbound_queue_depth: default_outbound_queue_depth(),
        }
    }
}

/// Idle, eviction, and shutdown timings
#[derive(Debug, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Idle allowance for a playing session, in seconds
    #[serde(default = "default_idle_playing_seconds")]
    pub idle_playing_seconds: u64,

    /// Idle allowance before authentication completes, in seconds
    #[serde(default = "default_idle_preauth_seconds")]
    pub idle_preauth_seconds: u64,

    /// Interval between stale-connection sweeps, in seconds
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Grace window for flushing pending output at close, in seconds
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,

    /// Inactivity before a per-address budget is garbage-collected, in seconds
    #[serde(default = "default_budget_gc_seconds")]
    pub budget_gc_seconds: u64,
}

impl TimeoutsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.idle_playing_seconds == 0 || self.idle_preauth_seconds == 0 {
            return Err("timeouts.idle thresholds must be positive".to_string());
        }
        if self.idle_preauth_seconds > self.idle_playing_seconds {
            return Err(
                "timeouts.idle_preauth_seconds must not exceed idle_playing_seconds".to_string(),
            );
        }
        if self.sweep_interval_seconds == 0 {
            return Err("timeouts.sweep_interval_seconds must be positive".to_string());
        }
        Ok(())
    }
}

fn default_idle_playing_seconds() -> u64 {
    1800
}

fn default_idle_preauth_seconds() -> u64 {
    60
}

fn default_sweep_interval_seconds() -> u64 {
    30
}

fn default_shutdown_grace_seconds() -> u64 {
    5
}

fn default_budget_gc_seconds() -> u64 {
    3600
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            idle_playing_seconds: default_idle_playing_seconds(),
            idle_preauth_seconds: default_idle_preauth_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
            budget_gc_seconds: default_budget_gc_seconds(),
        }
    }
}

/// Optional banner file overrides
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BannersConfig {
    pub welcome_file: Option<String>,
    pub motd_file: Option<String>,
}
