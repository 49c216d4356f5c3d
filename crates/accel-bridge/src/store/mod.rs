// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-series store abstraction.
//!
//! Defines the trait the bootstrap and ingestion pipeline write through.
//!
//! # Implementations
//!
//! - `InfluxClient` -- InfluxDB 1.x HTTP API
//! - `MemoryStore` -- in-process, records every call

pub mod influx;
pub mod memory;

pub use influx::InfluxClient;
pub use memory::MemoryStore;

use crate::point::Point;
use async_trait::async_trait;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Time-series store capability.
///
/// One handle lives for the whole process; calls are issued one at a time.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// List the names of existing databases.
    async fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    /// Create a database.
    async fn create_database(&self, name: &str) -> Result<(), StoreError>;

    /// Write a batch of points to `database` in a single request.
    async fn write_points(&self, database: &str, points: &[Point]) -> Result<(), StoreError>;
}
