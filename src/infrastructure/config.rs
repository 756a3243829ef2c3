use crate::application::session::SessionSettings;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub channel: ChannelSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub session: SessionTarget,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelSettings {
    #[serde(default = "default_channel_url")]
    pub url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_chart_interval_secs")]
    pub chart_interval_secs: u64,
    #[serde(default = "default_tank_interval_secs")]
    pub tank_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FeedSettings {
    pub max_len: Option<usize>,
}

/// Who and what the headless monitor watches.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionTarget {
    pub subject: Option<String>,
    pub plant: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_channel_url() -> String {
    "ws://localhost:8765".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_chart_interval_secs() -> u64 {
    30
}

fn default_tank_interval_secs() -> u64 {
    60
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            url: default_channel_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            chart_interval_secs: default_chart_interval_secs(),
            tank_interval_secs: default_tank_interval_secs(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl DashboardConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            chart_interval: Duration::from_secs(self.polling.chart_interval_secs),
            tank_interval: Duration::from_secs(self.polling.tank_interval_secs),
            reconnect_delay: Duration::from_millis(self.channel.reconnect_delay_ms),
            feed_max_len: self.feed.max_len.filter(|n| *n > 0),
        }
    }

    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  backend.base_url      : {}", self.backend.base_url);
        tracing::info!("  backend.timeout       : {}s", self.backend.request_timeout_secs);
        tracing::info!("  channel.url           : {}", self.channel.url);
        tracing::info!("  channel.reconnect     : {}ms", self.channel.reconnect_delay_ms);
        tracing::info!("  polling.chart_interval: {}s", self.polling.chart_interval_secs);
        tracing::info!("  polling.tank_interval : {}s", self.polling.tank_interval_secs);
        tracing::info!("  feed.max_len          : {:?}", self.feed.max_len);
    }
}

/// Reads `config/dashboard.*` when present, then `PLANT__SECTION__KEY`
/// environment overrides.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("PLANT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = from_toml("");
        let settings = cfg.session_settings();
        assert_eq!(settings, SessionSettings::default());
        assert_eq!(cfg.backend.base_url, "http://localhost:8080");
        assert_eq!(cfg.channel.url, "ws://localhost:8765");
        assert_eq!(cfg.backend.request_timeout(), Duration::from_secs(10));
        assert!(cfg.session.subject.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = from_toml(
            r#"
            [backend]
            base_url = "http://plants.local:9000/"

            [channel]
            reconnect_delay_ms = 500

            [polling]
            chart_interval_secs = 5

            [feed]
            max_len = 50

            [session]
            subject = "alice"
            plant = "PLANT_123456"
            "#,
        );
        assert_eq!(cfg.backend.base_url, "http://plants.local:9000/");
        assert_eq!(cfg.polling.tank_interval_secs, 60);

        let settings = cfg.session_settings();
        assert_eq!(settings.chart_interval, Duration::from_secs(5));
        assert_eq!(settings.reconnect_delay, Duration::from_millis(500));
        assert_eq!(settings.feed_max_len, Some(50));
        assert_eq!(cfg.session.plant.as_deref(), Some("PLANT_123456"));
    }

    #[test]
    fn test_zero_feed_length_means_unbounded() {
        let cfg = from_toml("[feed]\nmax_len = 0\n");
        assert_eq!(cfg.session_settings().feed_max_len, None);
    }
}
