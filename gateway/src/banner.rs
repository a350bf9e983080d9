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

//! Login banners
//!
//! The welcome banner greets every accepted connection; the message of the
//! day is shown once authentication completes. Both carry `&`-markup and can
//! be overridden from files named in the configuration.

use crate::config::BannersConfig;

/// Welcome banner and message of the day
#[derive(Debug, Clone)]
pub struct BannerSet {
    pub welcome: String,
    pub motd: String,
}

impl Default for BannerSet {
    fn default() -> Self {
        Self {
            welcome: concat!(
                "&G        .  ~  T H O R N V A L E  ~  .&n\r\n",
                "\r\n",
                "&gAn old wood, a dark road, and the smell of coming rain.&n\r\n"
            )
            .to_string(),
            motd: "&yThe thornwood stirs of late. Report anything odd to the keepers.&n"
                .to_string(),
        }
    }
}

impl BannerSet {
    /// Load banners, applying any file overrides from the configuration
    ///
    /// A missing or unreadable file is logged and falls back to the built-in
    /// text; banners are not worth refusing to boot over.
    pub fn load(config: Option<&BannersConfig>) -> Self {
        let mut banners = Self::default();
        let Some(config) = config else {
            return banners;
        };

        if let Some(path) = &config.welcome_file {
            match std::fs::read_to_string(path) {
                Ok(text) => banners.welcome = text,
                Err(e) => tracing::warn!("failed to read welcome banner {}: {}", path, e),
            }
        }
        if let Some(path) = &config.motd_file {
            match std::fs::read_to_string(path) {
                Ok(text) => banners.motd = text,
                Err(e) => tracing::warn!("failed to read motd {}: {}", path, e),
            }
        }

        banners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_banners_present() {
        let banners = BannerSet::default();
        assert!(!banners.welcome.is_empty());
        assert!(!banners.motd.is_empty());
    }

    #[test]
    fn test_load_without_config_uses_defaults() {
        let banners = BannerSet::load(None);
        assert_eq!(banners.welcome, BannerSet::default().welcome);
    }

    #[test]
    fn test_load_with_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "&GCustom greeting&n\r\n").unwrap();

        let config = BannersConfig {
            welcome_file: Some(file.path().to_str().unwrap().to_string()),
            motd_file: None,
        };
        let banners = BannerSet::load(Some(&config));
        assert!(banners.welcome.contains("Custom greeting"));
        assert_eq!(banners.motd, BannerSet::default().motd);
    }

    #[test]
    fn test_missing_override_falls_back() {
        let config = BannersConfig {
            welcome_file: Some("/nonexistent/banner.txt".to_string()),
            motd_file: None,
        };
        let banners = BannerSet::load(Some(&config));
        assert_eq!(banners.welcome, BannerSet::default().welcome);
    }
}
