// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion pipeline.
//!
//! Per inbound message: decode -> build points -> one batch write.
//!
//! ```text
//! InboundMessage --> decode() --> build_points() --> TimeSeriesStore::write_points()
//! ```
//!
//! Failures are isolated to the message that caused them. A payload that
//! does not decode, or a batch the store rejects, is logged and dropped;
//! there is no retry and no local queue.

use crate::bootstrap::Database;
use crate::point::build_points;
use crate::reading::{decode, DecodeError};
use crate::store::{StoreError, TimeSeriesStore};
use crate::transport::InboundMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// What happened to one inbound message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Both points were written.
    Written { points: usize },
    /// Payload rejected by the decoder; nothing written.
    DecodeFailed(DecodeError),
    /// Points built but the store write failed; batch dropped.
    WriteFailed(StoreError),
}

impl MessageOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Pipeline counters.
#[derive(Debug)]
pub struct PipelineStats {
    pub messages_received: AtomicU64,
    pub messages_decoded: AtomicU64,
    pub decode_errors: AtomicU64,
    pub batches_written: AtomicU64,
    pub points_written: AtomicU64,
    pub write_errors: AtomicU64,
    pub created: Instant,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            points_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pipeline statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    pub messages_received: u64,
    pub messages_decoded: u64,
    pub decode_errors: u64,
    pub batches_written: u64,
    pub points_written: u64,
    pub write_errors: u64,
    pub uptime_secs: u64,
}

impl PipelineStatsSnapshot {
    /// Calculate messages per second.
    pub fn messages_per_second(&self) -> f64 {
        if self.uptime_secs > 0 {
            self.messages_received as f64 / self.uptime_secs as f64
        } else {
            0.0
        }
    }
}

/// Message-to-store pipeline.
///
/// Holds the store handle and the bootstrapped write target. Messages are
/// processed strictly one at a time.
pub struct IngestPipeline<S: TimeSeriesStore> {
    store: Arc<S>,
    database: Database,
    stats: Arc<PipelineStats>,
}

impl<S: TimeSeriesStore> IngestPipeline<S> {
    pub fn new(store: Arc<S>, database: Database) -> Self {
        Self {
            store,
            database,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Shared handle to the counters, for periodic reporting.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Process one inbound message to completion.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> MessageOutcome {
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);

        let reading = match decode(topic, payload) {
            Ok(reading) => reading,
            Err(err) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropping message on '{}': {}", topic, err);
                return MessageOutcome::DecodeFailed(err);
            }
        };
        self.stats.messages_decoded.fetch_add(1, Ordering::Relaxed);

        let points = build_points(&reading);

        match self
            .store
            .write_points(self.database.name(), &points)
            .await
        {
            Ok(()) => {
                self.stats.batches_written.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .points_written
                    .fetch_add(points.len() as u64, Ordering::Relaxed);
                if tracing::enabled!(tracing::Level::DEBUG) {
                    let body = serde_json::to_string(&points).unwrap_or_default();
                    tracing::debug!("Wrote to '{}': {}", self.database, body);
                }
                MessageOutcome::Written {
                    points: points.len(),
                }
            }
            Err(err) => {
                self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Write to '{}' failed for device '{}': {}",
                    self.database,
                    reading.device(),
                    err
                );
                MessageOutcome::WriteFailed(err)
            }
        }
    }

    /// Consume messages until every sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>) {
        tracing::info!("Pipeline writing to database '{}'", self.database);

        while let Some(msg) = rx.recv().await {
            self.handle_message(&msg.topic, &msg.payload).await;
        }

        tracing::info!("Pipeline input closed");
    }
}
