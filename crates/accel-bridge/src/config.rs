// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Loaded once from a TOML file at startup. Every key has a default, so an
//! empty file (or no file at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge name (for identification in logs).
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level / tracing filter directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Statistics reporting interval (seconds, 0 to disable).
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,

    /// Time-series store settings.
    #[serde(default)]
    pub influxdb: InfluxConfig,

    /// Pub/sub transport settings.
    #[serde(default)]
    pub mqtt: MqttConfig,
}

fn default_name() -> String {
    "accel-bridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_interval() -> u64 {
    60
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            stats_interval_secs: default_stats_interval(),
            influxdb: InfluxConfig::default(),
            mqtt: MqttConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.influxdb.host.is_empty() {
            return Err(ConfigError::Invalid("influxdb.host is empty".into()));
        }
        if self.influxdb.port == 0 {
            return Err(ConfigError::Invalid("influxdb.port must be non-zero".into()));
        }
        if self.influxdb.database.is_empty() {
            return Err(ConfigError::Invalid("influxdb.database is empty".into()));
        }

        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Invalid("mqtt.host is empty".into()));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::Invalid("mqtt.port must be non-zero".into()));
        }
        if self.mqtt.topic.is_empty() {
            return Err(ConfigError::Invalid("mqtt.topic is empty".into()));
        }
        if self.mqtt.topic.contains(['+', '#']) {
            return Err(ConfigError::Invalid(format!(
                "mqtt.topic '{}' must not contain wildcards",
                self.mqtt.topic
            )));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Invalid("mqtt.client_id is empty".into()));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "mqtt.channel_capacity must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// InfluxDB 1.x connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_host")]
    pub host: String,

    #[serde(default = "default_influx_port")]
    pub port: u16,

    #[serde(default = "default_influx_username")]
    pub username: String,

    #[serde(default = "default_influx_password")]
    pub password: String,

    /// Target database, created at startup if absent.
    #[serde(default = "default_influx_database")]
    pub database: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_influx_timeout")]
    pub timeout_secs: u64,
}

fn default_influx_host() -> String {
    "influxdb".to_string()
}

fn default_influx_port() -> u16 {
    8086
}

fn default_influx_username() -> String {
    "root".to_string()
}

fn default_influx_password() -> String {
    "root".to_string()
}

fn default_influx_database() -> String {
    "treadmill2".to_string()
}

fn default_influx_timeout() -> u64 {
    10
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: default_influx_host(),
            port: default_influx_port(),
            username: default_influx_username(),
            password: default_influx_password(),
            database: default_influx_database(),
            timeout_secs: default_influx_timeout(),
        }
    }
}

impl InfluxConfig {
    /// Base URL of the HTTP API.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// MQTT connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_mqtt_username")]
    pub username: String,

    #[serde(default = "default_mqtt_password")]
    pub password: String,

    /// Topic carrying sensor readings.
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,

    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Pause before the next reconnect attempt after a connection error.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Bound of the transport -> pipeline message queue.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_mqtt_host() -> String {
    "mosquitto".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_username() -> String {
    "mqttuser".to_string()
}

fn default_mqtt_password() -> String {
    "mqttpassword".to_string()
}

fn default_mqtt_topic() -> String {
    "accel/data".to_string()
}

fn default_mqtt_client_id() -> String {
    "MQTTInfluxDBBridge".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: default_mqtt_username(),
            password: default_mqtt_password(),
            topic: default_mqtt_topic(),
            client_id: default_mqtt_client_id(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_ms: default_reconnect_delay(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
