//! Configuration module
//!
//! Handles loading and saving the receiver configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default AMQP port
pub const DEFAULT_PORT: u16 = 5672;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Broker connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Queue declaration and binding
    #[serde(default)]
    pub queue: QueueConfig,

    /// Consumer behaviour
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

/// Broker connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Virtual host on the broker
    #[serde(default = "default_virtual_host")]
    pub virtual_host: String,
    #[serde(default = "default_guest")]
    pub username: String,
    #[serde(default = "default_guest")]
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_virtual_host() -> String {
    "/".to_string()
}

fn default_guest() -> String {
    "guest".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            virtual_host: default_virtual_host(),
            username: default_guest(),
            password: default_guest(),
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue to declare and consume from
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// Exchange the queue is bound to
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Binding pattern, e.g. "events.#" for all events
    #[serde(default = "default_routing_key")]
    pub routing_key: String,
    /// Queue survives broker restarts
    #[serde(default = "default_true")]
    pub durable: bool,
    /// Queue is private to this connection
    #[serde(default)]
    pub exclusive: bool,
    /// Queue is deleted when the last consumer goes away
    #[serde(default)]
    pub auto_delete: bool,
}

fn default_queue_name() -> String {
    "events.receiver".to_string()
}

fn default_exchange() -> String {
    "amq.topic".to_string()
}

fn default_routing_key() -> String {
    "events.#".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            exchange: default_exchange(),
            routing_key: default_routing_key(),
            durable: default_true(),
            exclusive: false,
            auto_delete: false,
        }
    }
}

/// What to do with a delivery that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeFailurePolicy {
    /// Leave unacknowledged; the broker redelivers after the channel closes
    #[default]
    Leave,
    /// Reject without requeue (dead-lettered if the queue has a DLX)
    Reject,
    /// Reject and requeue immediately
    Requeue,
}

/// Consumer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer tag (auto-generated if not set)
    pub tag: Option<String>,
    /// basic.qos prefetch window, 0 = unlimited
    #[serde(default)]
    pub prefetch_count: u16,
    /// Handling of undecodable deliveries
    #[serde(default)]
    pub on_decode_error: DecodeFailurePolicy,
}

impl ConsumerConfig {
    /// Get the consumer tag, generating one if not set
    pub fn consumer_tag(&self) -> String {
        self.tag.clone().unwrap_or_else(|| {
            let host = hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "event-receiver".to_string());
            format!("{}-{}", host, uuid::Uuid::new_v4())
        })
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("event-receiver/config.toml")),
            Some(PathBuf::from("./event-receiver.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        server: ServerConfig {
            host: "rabbitmq.example.com".to_string(),
            username: "receiver".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        },
        queue: QueueConfig {
            name: "events.receiver.test".to_string(),
            exchange: "acm.leps".to_string(),
            ..Default::default()
        },
        consumer: ConsumerConfig {
            tag: Some("events-receiver-1".to_string()),
            ..Default::default()
        },
    };

    Ok(toml::to_string_pretty(&config)?)
}
