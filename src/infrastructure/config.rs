use crate::infrastructure::feed_client::ReconnectPolicy;
use crate::infrastructure::file_store::default_store_path;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub feed: FeedSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    pub endpoint: String,
    pub event: String,
    pub topic: String,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl FeedSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_initial_ms),
            Duration::from_millis(self.reconnect_max_ms),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub key: String,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

/// Defaults, then `config/monitor.*` if present, then `DARKNESS_*` environment
/// variables (`__` separates nested keys). `DARKNESS_API_URL` overrides the feed endpoint.
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false));
    build_config(builder, std::env::var("DARKNESS_API_URL").ok())
}

fn build_config(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    api_url: Option<String>,
) -> anyhow::Result<MonitorConfig> {
    let settings = builder
        .set_default("feed.endpoint", DEFAULT_ENDPOINT)?
        .set_default("feed.event", "mqtt_message")?
        .set_default("feed.topic", "sensors/ldr")?
        .set_default("feed.reconnect_initial_ms", 500)?
        .set_default("feed.reconnect_max_ms", 30_000)?
        .set_default("storage.key", "darknessChartData")?
        .set_default("server.bind", "0.0.0.0:8080")?
        .add_source(
            config::Environment::with_prefix("DARKNESS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("feed.endpoint", api_url.filter(|u| !u.trim().is_empty()))?
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = build_config(config::Config::builder(), None).unwrap();

        assert_eq!(config.feed.endpoint, "http://localhost:3000");
        assert_eq!(config.feed.event, "mqtt_message");
        assert_eq!(config.feed.topic, "sensors/ldr");
        assert_eq!(config.storage.key, "darknessChartData");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(
            config.feed.reconnect_policy(),
            ReconnectPolicy::new(Duration::from_millis(500), Duration::from_secs(30))
        );
        assert!(config.storage.resolved_path().ends_with("storage.json"));
    }

    #[test]
    fn test_file_values_and_api_url_override() {
        let builder = config::Config::builder().add_source(config::File::from_str(
            r#"
            [feed]
            endpoint = "http://broker.local:4000"
            topic = "sensors/ldr2"

            [storage]
            path = "/tmp/darkness.json"
            "#,
            config::FileFormat::Toml,
        ));
        let config = build_config(builder, None).unwrap();
        assert_eq!(config.feed.endpoint, "http://broker.local:4000");
        assert_eq!(config.feed.topic, "sensors/ldr2");
        assert_eq!(
            config.storage.resolved_path(),
            PathBuf::from("/tmp/darkness.json")
        );

        let builder = config::Config::builder().add_source(config::File::from_str(
            "[feed]\nendpoint = \"http://broker.local:4000\"",
            config::FileFormat::Toml,
        ));
        let config = build_config(builder, Some("https://feed.example.com".to_string())).unwrap();
        assert_eq!(config.feed.endpoint, "https://feed.example.com");
    }
}
