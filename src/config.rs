//! Configuration management

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub charts: ChartsConfig,
    pub logging: LoggingConfig,
}

/// Where the dashboard itself listens
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 8088,
        }
    }
}

/// Upstream log-monitoring API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. "http://logs.internal:5000"
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Attempts per stats/logs fetch; 1 disables retry
    pub retries: u32,
    /// First backoff delay, doubled after each failed attempt
    pub retry_base_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 10,
            retries: 1,
            retry_base_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub stats_interval_ms: u64,
    pub logs_interval_ms: u64,
    pub page_size: u32,
    pub auto_refresh_logs: bool,
    /// Ask the server for a full re-read of the log file on startup sync
    pub force_sync: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 3000,
            logs_interval_ms: 30000,
            page_size: 50,
            auto_refresh_logs: true,
            force_sync: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Whether the page ships a charting engine
    pub enabled: bool,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` (optional) with `LOGDASH_*` environment overrides
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name("config").required(false))
    }

    /// Build from one file source plus the environment
    pub fn build<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = config::Config::builder()
            .add_source(source)
            .add_source(
                config::Environment::with_prefix("LOGDASH")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.http_port == 0 {
            anyhow::bail!("Invalid http_port: 0 is not allowed");
        }
        if self.server.host.is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }

        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("API base_url cannot be empty");
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            anyhow::bail!("API base_url '{}' must start with http:// or https://", self.api.base_url);
        }
        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("API request_timeout_secs must be positive");
        }

        if self.polling.stats_interval_ms == 0 || self.polling.logs_interval_ms == 0 {
            anyhow::bail!("Polling intervals must be positive");
        }
        if self.polling.page_size == 0 {
            anyhow::bail!("Page size must be positive");
        }

        // Validate logging level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid logging level '{}'. Must be one of: {:?}", self.logging.level, valid_levels);
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}
