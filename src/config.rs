use serde::Deserialize;

use crate::models::{Category, Metric};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub polling: PollingConfig,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Where the cluster master lives and how its endpoints are named.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_jobs_path")]
    pub jobs_path: String,
    #[serde(default = "default_nodes_path")]
    pub nodes_path: String,
    #[serde(default = "default_cluster_path")]
    pub cluster_path: String,
    /// Query parameter carrying the "seconds since" value on the cluster endpoint.
    #[serde(default = "default_since_param")]
    pub since_param: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_jobs_path() -> String {
    "/jobs/".into()
}

fn default_nodes_path() -> String {
    "/nodes/".into()
}

fn default_cluster_path() -> String {
    "/cluster".into()
}

fn default_since_param() -> String {
    "since".into()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Initial window (ticks kept per category). Adjustable at runtime via PUT /api/window.
    pub window_size: usize,
    #[serde(default = "default_true")]
    pub filter_all_zero: bool,
    #[serde(default)]
    pub jobs_metric: Option<Metric>,
    #[serde(default)]
    pub nodes_metric: Option<Metric>,
    #[serde(default = "default_true")]
    pub cluster_enabled: bool,
    /// Initial "seconds since" for the cluster endpoint. Adjustable via PUT /api/since.
    #[serde(default = "default_cluster_seconds_since")]
    pub cluster_seconds_since: u64,
}

fn default_true() -> bool {
    true
}

fn default_cluster_seconds_since() -> u64 {
    3600
}

impl PollingConfig {
    pub fn metric_for(&self, category: Category) -> Metric {
        let configured = match category {
            Category::Jobs => self.jobs_metric,
            Category::Nodes => self.nodes_metric,
        };
        configured.unwrap_or_else(|| category.default_metric())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of frame updates kept in the broadcast channel for /ws/charts (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log poller stats (applied/failed/stale fetches) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.source.base_url.starts_with("http://")
                || self.source.base_url.starts_with("https://"),
            "source.base_url must be an http(s) URL, got {:?}",
            self.source.base_url
        );
        anyhow::ensure!(
            self.source.request_timeout_ms > 0,
            "source.request_timeout_ms must be > 0, got {}",
            self.source.request_timeout_ms
        );
        anyhow::ensure!(
            !self.source.since_param.is_empty(),
            "source.since_param must be non-empty"
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.window_size > 0,
            "polling.window_size must be > 0, got {}",
            self.polling.window_size
        );
        for category in Category::ALL {
            let metric = self.polling.metric_for(category);
            anyhow::ensure!(
                metric.belongs_to(category),
                "polling.{}_metric {:?} is not a {} metric",
                category,
                metric,
                category
            );
        }
        anyhow::ensure!(
            !self.polling.cluster_enabled || self.polling.cluster_seconds_since > 0,
            "polling.cluster_seconds_since must be > 0 when cluster_enabled, got {}",
            self.polling.cluster_seconds_since
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
