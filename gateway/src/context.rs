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

use crate::banner::BannerSet;
use crate::config::Configuration;
use crate::governor::ResourceGovernor;
use std::sync::Arc;
use thornvale_common::{AccountDirectory, CharacterForge, CommandEngine};

/// Server context containing shared resources
///
/// Built once at startup and passed by reference to the acceptor and every
/// connection; the governor's counters are the only state in here touched by
/// more than one task.
#[derive(Clone)]
pub struct ServerContext {
    /// Validated startup configuration
    pub config: Arc<Configuration>,

    /// Admission control and stale-connection eviction
    pub governor: Arc<ResourceGovernor>,

    /// Account lookup, verification, and creation
    pub directory: Arc<dyn AccountDirectory>,

    /// Character creation dialogue
    pub forge: Arc<dyn CharacterForge>,

    /// Command processing for playing sessions
    pub engine: Arc<dyn CommandEngine>,

    /// Welcome banner and message of the day
    pub banners: Arc<BannerSet>,
}

impl ServerContext {
    /// Create a new server context
    pub fn new(
        config: Arc<Configuration>,
        governor: Arc<ResourceGovernor>,
        directory: Arc<dyn AccountDirectory>,
        forge: Arc<dyn CharacterForge>,
        engine: Arc<dyn CommandEngine>,
        banners: Arc<BannerSet>,
    ) -> Self {
        Self {
            config,
            governor,
            directory,
            forge,
            engine,
            banners,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Get the resource governor
    pub fn governor(&self) -> &Arc<ResourceGovernor> {
        &self.governor
    }

    /// Get the account directory
    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    /// Get the character forge
    pub fn forge(&self) -> &Arc<dyn CharacterForge> {
        &self.forge
    }

    /// Get the command engine
    pub fn engine(&self) -> &Arc<dyn CommandEngine> {
        &self.engine
    }

    /// Get the banner set
    pub fn banners(&self) -> &Arc<BannerSet> {
        &self.banners
    }

    /// Idle read deadline for a session in the given phase
    pub fn idle_deadline(&self, pre_auth: bool) -> std::time::Duration {
        let seconds = if pre_auth {
            self.config.timeouts.idle_preauth_seconds
        } else {
            self.config.timeouts.idle_playing_seconds
        };
        std::time::Duration::from_secs(seconds)
    }

    /// Grace window for flushing output at close
    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.timeouts.shutdown_grace_seconds)
    }
}
