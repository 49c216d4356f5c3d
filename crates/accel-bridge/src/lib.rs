// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT to InfluxDB Bridge
//!
//! Subscribes to a topic carrying motion-sensor readings, decodes each
//! message, derives the total acceleration magnitude, and writes the result
//! to InfluxDB as two points tagged with the originating device.
//!
//! # Architecture
//!
//! ```text
//! rumqttc EventLoop --> TransportAdapter --mpsc--> IngestPipeline --> TimeSeriesStore
//!                        (re-subscribes                decode()
//!                         on every ConnAck)            build_points()
//! ```
//!
//! Messages are processed one at a time, in delivery order. A message that
//! fails to decode or write is logged and dropped.
//!
//! # Quick Start
//!
//! ```bash
//! # Run with built-in defaults
//! accel-bridge
//!
//! # Using config file
//! accel-bridge --config bridge.toml
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! [influxdb]
//! host = "influxdb"
//! database = "treadmill2"
//!
//! [mqtt]
//! host = "mosquitto"
//! topic = "accel/data"
//! ```

pub mod bootstrap;
pub mod config;
pub mod metric;
pub mod pipeline;
pub mod point;
pub mod reading;
pub mod store;
pub mod transport;

pub use bootstrap::{bootstrap, BootstrapError, Database};
pub use config::{BridgeConfig, ConfigError, InfluxConfig, MqttConfig};
pub use pipeline::{IngestPipeline, MessageOutcome, PipelineStats, PipelineStatsSnapshot};
pub use point::{build_points, FieldValue, Point};
pub use reading::{decode, DecodeError, SensorReading};
pub use store::{InfluxClient, MemoryStore, StoreError, TimeSeriesStore};
pub use transport::{InboundMessage, TransportAdapter, TransportError, TransportEvent};
