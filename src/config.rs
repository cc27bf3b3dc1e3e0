//! Configuration for the oddsfeed daemon.
//!
//! Loaded from a TOML file; every section falls back to defaults so a partial
//! file is enough to get a working setup.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{Mode, SportMode};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub websocket: WebsocketConfig,
    pub upstream: UpstreamConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Directory for the per-match append-only audit files.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: "./odds_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebsocketConfig {
    pub host: String,
    pub port: u16,
    /// Cadence at which the relay pushes the latest batch to subscribers.
    pub push_interval_secs: u64,
    /// Capacity of the batch queue between pollers and the relay. Clamped at
    /// runtime to at least the number of configured pollers, otherwise a slow
    /// consumer could wedge a poller mid-publish.
    pub batch_queue_capacity: usize,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6003,
            push_interval_secs: 5,
            batch_queue_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Offering API base, country segment included.
    pub api_base: String,
    /// Country code used for the Origin/Referer identity headers.
    pub country_code: String,
    pub lang: String,
    pub market: String,
    pub client_id: String,
    pub channel_id: String,
    pub user_agent: String,
    /// Listing path for upcoming matches; `{sport}` is substituted.
    pub list_path: String,
    /// Listing path for in-play matches; `{sport}` is substituted.
    pub live_list_path: String,
    /// Detail path for one match; `{id}` is substituted.
    pub match_path: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://eu-offering-api.kambicdn.com/offering/v2018/ub".to_string(),
            country_code: "com".to_string(),
            lang: "en_GB".to_string(),
            market: "GB".to_string(),
            client_id: "2".to_string(),
            channel_id: "1".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            list_path: "/listView/{sport}/all/all/all/matches.json".to_string(),
            live_list_path: "/listView/{sport}/all/all/all/in-play.json".to_string(),
            match_path: "/betoffer/event/{id}.json".to_string(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub live_interval_secs: u64,
    pub prematch_interval_secs: u64,
    /// Size of the process-wide permit pool bounding concurrent match fetches.
    pub max_concurrent_fetches: usize,
    pub sports: Vec<SportMode>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            live_interval_secs: 10,
            prematch_interval_secs: 60,
            max_concurrent_fetches: 10,
            sports: vec![
                SportMode {
                    sport: "football".to_string(),
                    mode: Mode::PreMatch,
                },
                SportMode {
                    sport: "tennis".to_string(),
                    mode: Mode::PreMatch,
                },
            ],
        }
    }
}

impl PollingConfig {
    /// Inter-cycle sleep for the given mode.
    pub fn interval(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Live => Duration::from_secs(self.live_interval_secs),
            Mode::PreMatch => Duration::from_secs(self.prematch_interval_secs),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML config")
    }

    /// Effective batch queue capacity: never below the poller count.
    pub fn batch_queue_capacity(&self) -> usize {
        self.websocket
            .batch_queue_capacity
            .max(self.polling.sports.len())
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.websocket.port, 6003);
        assert_eq!(config.polling.sports.len(), 2);
        assert_eq!(config.polling.interval(Mode::Live), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [general]
            log_level = "debug"
            data_dir = "/odds_data"

            [websocket]
            port = 7000
            batch_queue_capacity = 8

            [upstream]
            timeout_secs = 5
            lang = "nl_NL"

            [polling]
            live_interval_secs = 3

            [[polling.sports]]
            sport = "tennis"
            mode = "Live"

            [[polling.sports]]
            sport = "football"
            mode = "PreMatch"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.websocket.port, 7000);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.lang, "nl_NL");
        assert_eq!(config.polling.sports.len(), 2);
        assert_eq!(config.polling.sports[0].mode, Mode::Live);
        assert_eq!(config.polling.interval(Mode::Live), Duration::from_secs(3));
        // Untouched sections keep their defaults.
        assert_eq!(config.websocket.push_interval_secs, 5);
    }

    #[test]
    fn test_queue_capacity_clamped_to_poller_count() {
        let toml = r#"
            [websocket]
            batch_queue_capacity = 1

            [[polling.sports]]
            sport = "football"
            mode = "Live"

            [[polling.sports]]
            sport = "football"
            mode = "PreMatch"

            [[polling.sports]]
            sport = "tennis"
            mode = "Live"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.batch_queue_capacity(), 3);
    }
}
