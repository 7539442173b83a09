use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub pool_resolution: PoolResolution,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub observability: Observability,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50100/api/v1".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Polling {
    pub interval_ms: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

impl Polling {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Pool address → token mint lookup, used when a page only knows its pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolResolution {
    pub lookup_url: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PoolResolution {
    fn default() -> Self {
        Self {
            lookup_url: "https://api.geckoterminal.com/api/v2/networks/solana/pools".to_string(),
            max_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub path: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: "data/dashboard.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Prometheus scrape endpoint; disabled when no port is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observability {
    pub prometheus_port: Option<u16>,
}

impl DashboardConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashboardConfig =
            toml::from_str(content).context("failed to parse dashboard config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.api.base_url.is_empty(), "api.base_url must be set");
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0"
        );
        anyhow::ensure!(
            self.pool_resolution.max_attempts >= 1,
            "pool_resolution.max_attempts must be >= 1"
        );
        Ok(())
    }

    pub fn default_config_path() -> String {
        // Check config/ directory relative to cwd
        let candidate = Path::new("config/dashboard.toml");
        if candidate.exists() {
            return candidate.to_string_lossy().to_string();
        }

        // Check crates/engine/config/ (development)
        let candidate = Path::new("crates/engine/config/dashboard.toml");
        if candidate.exists() {
            return candidate.to_string_lossy().to_string();
        }

        "config/dashboard.toml".to_string()
    }
}

impl FromStr for DashboardConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
