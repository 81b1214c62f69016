//! Configuration loader.
//!
//! TOML file deserialized with `serde`: read the file, parse, then let
//! environment variables override the handful of fields that are actually
//! secrets or deployment-specific (database URL, Kafka bootstrap servers).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_transition_timeout_secs() -> u64 {
    5
}

fn default_sweep_interval_secs() -> u64 {
    5
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Startup configuration: the auto-register toggle plus the ambient
/// stack's own settings (database, Kafka, REST bind address, sweeper
/// cadence, log format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether an unknown account name auto-registers on login instead of
    /// failing with `AccountNotFound`.
    #[serde(default = "default_true")]
    pub automatic_register: bool,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub kafka: KafkaConfig,

    #[serde(default = "default_bind_addr")]
    pub rest_bind_addr: String,

    #[serde(default = "default_metrics_addr")]
    pub metrics_bind_addr: String,

    #[serde(default = "default_transition_timeout_secs")]
    pub transition_timeout_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            automatic_register: true,
            database: DatabaseConfig::default(),
            kafka: KafkaConfig::default(),
            rest_bind_addr: default_bind_addr(),
            metrics_bind_addr: default_metrics_addr(),
            transition_timeout_secs: default_transition_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "postgres://localhost/accountd".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: String,
    #[serde(default = "default_command_topic_create_account")]
    pub command_topic_create_account: String,
    #[serde(default = "default_command_topic_account_session")]
    pub command_topic_account_session: String,
    #[serde(default = "default_event_topic_account_status")]
    pub event_topic_account_status: String,
    #[serde(default = "default_event_topic_account_session_status")]
    pub event_topic_account_session_status: String,
}

fn default_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}
fn default_command_topic_create_account() -> String {
    "CREATE_ACCOUNT_COMMAND".to_string()
}
fn default_command_topic_account_session() -> String {
    "ACCOUNT_SESSION_COMMAND".to_string()
}
fn default_event_topic_account_status() -> String {
    "ACCOUNT_STATUS_EVENT".to_string()
}
fn default_event_topic_account_session_status() -> String {
    "ACCOUNT_SESSION_STATUS_EVENT".to_string()
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            command_topic_create_account: default_command_topic_create_account(),
            command_topic_account_session: default_command_topic_account_session(),
            event_topic_account_status: default_event_topic_account_status(),
            event_topic_account_session_status: default_event_topic_account_session_status(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::ConfigError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| CoreError::ConfigError(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(servers) = std::env::var("KAFKA_BOOTSTRAP_SERVERS") {
            self.kafka.bootstrap_servers = servers;
        }
    }

    pub fn transition_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.transition_timeout_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}
