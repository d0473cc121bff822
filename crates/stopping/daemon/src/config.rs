//! Configuration for stopping-daemon

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use stopping_cluster::KubernetesConfig;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Instance store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cluster gateway configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Reconciliation loop configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Downstream notification endpoints
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Cluster gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClusterConfig {
    /// In-memory cluster with no pods (for development)
    #[default]
    Memory,

    /// Kubernetes API server
    Kubernetes(KubernetesConfig),
}

/// Reconciliation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Run the loop at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between passes
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: default_check_interval(),
        }
    }
}

/// Notification endpoints. An unset URL disables that channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Base URL of the statistics service
    #[serde(default)]
    pub statistics_url: Option<String>,

    /// Base URL of the user log service
    #[serde(default)]
    pub logging_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_notify_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            statistics_url: None,
            logging_url: None,
            request_timeout_secs: default_notify_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_check_interval() -> u64 {
    10
}

fn default_notify_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file, then
    /// `STOPPING_*` environment variables (`__` separates nested keys, e.g.
    /// `STOPPING_MONITOR__CHECK_INTERVAL_SECS=30`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("STOPPING")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(matches!(config.cluster, ClusterConfig::Memory));
        assert!(config.notifier.statistics_url.is_none());
    }

    #[test]
    fn test_monitor_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.check_interval_secs, 10);
        assert!(config.enabled);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.monitor.check_interval_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("stoppingd-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[monitor]
check_interval_secs = 30

[cluster]
type = "kubernetes"
api_url = "https://10.0.0.1:6443"
list_field_selector = "metadata.namespace=algo-test"

[storage]
type = "postgres"
url = "postgres://localhost/algostore"

[notifier]
statistics_url = "http://statistics"
"#,
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.monitor.check_interval_secs, 30);
        match config.cluster {
            ClusterConfig::Kubernetes(k8s) => {
                assert_eq!(k8s.api_url, "https://10.0.0.1:6443");
                assert_eq!(k8s.request_timeout_secs, 30);
                assert_eq!(
                    k8s.list_field_selector.as_deref(),
                    Some("metadata.namespace=algo-test")
                );
            }
            other => panic!("unexpected cluster config: {:?}", other),
        }
        match config.storage {
            StorageConfig::Postgres {
                max_connections, ..
            } => assert_eq!(max_connections, 10),
            other => panic!("unexpected storage config: {:?}", other),
        }
        assert_eq!(
            config.notifier.statistics_url.as_deref(),
            Some("http://statistics")
        );
    }
}
