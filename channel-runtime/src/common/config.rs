/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Runtime configuration shared by controllers and the in-memory broker.
///
/// Loaded from TOML files in XDG-compliant directories; every section and field is optional
/// and falls back to its default.
///
/// ```toml
/// [timeouts]
/// reply_timeout_ms = 2000
/// close_timeout_ms = 5000
///
/// [limits]
/// subscription_buffer = 64
///
/// [behavior]
/// log_envelopes = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Behavioral configuration switches
    pub behavior: BehaviorConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on a reply wait in milliseconds, `0` waits until cancelled
    pub reply_timeout_ms: u64,
    /// How long close waits for dispatch loops to finish before aborting them, in milliseconds
    pub close_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-subscription channel capacity of the in-memory broker
    pub subscription_buffer: usize,
}

/// Behavioral configuration switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Attach the rendered envelope to every message context
    pub log_envelopes: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 0,
            close_timeout_ms: 5_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            subscription_buffer: 64,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_envelopes: true,
        }
    }
}

impl RuntimeConfig {
    /// Reply timeout as a `Duration`, `None` when waits are unbounded.
    #[must_use]
    pub const fn reply_timeout(&self) -> Option<Duration> {
        match self.timeouts.reply_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Close timeout as a `Duration`.
    #[must_use]
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.close_timeout_ms)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the TOML error when the string is not a valid configuration.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Loads configuration from a TOML file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(config_str) => match Self::from_toml_str(&config_str) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `channel-runtime/config.toml` under `$XDG_CONFIG_HOME` (then the XDG
    /// config dirs). Returns the default configuration when no file is found; a malformed
    /// file is logged and ignored.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("channel-runtime") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        xdg_dirs.find_config_file("config.toml").map_or_else(
            || {
                info!("No configuration file found, using defaults");
                Self::default()
            },
            |path| Self::load_from(&path),
        )
    }
}

lazy_static! {
    /// Process-wide configuration loaded from XDG-compliant locations.
    ///
    /// Used as the default by [`ControllerBuilder`](crate::controller::ControllerBuilder) and
    /// [`MemoryBroker::new`](crate::broker::MemoryBroker::new).
    pub static ref CONFIG: RuntimeConfig = RuntimeConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.reply_timeout(), None);
        assert_eq!(config.close_timeout(), Duration::from_secs(5));
        assert_eq!(config.limits.subscription_buffer, 64);
        assert!(config.behavior.log_envelopes);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r"
            [timeouts]
            reply_timeout_ms = 250
            ",
        )
        .expect("valid toml");

        assert_eq!(config.reply_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.timeouts.close_timeout_ms, 5_000);
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(RuntimeConfig::from_toml_str("[limits]\nsubscription_buffer = \"lots\"").is_err());
    }
}
