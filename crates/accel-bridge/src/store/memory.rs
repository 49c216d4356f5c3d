// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory store.
//!
//! Records databases, create calls and written batches. Write failures can
//! be injected to exercise error paths.

use super::{StoreError, TimeSeriesStore};
use crate::point::Point;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    databases: BTreeSet<String>,
    batches: Vec<(String, Vec<Point>)>,
    fail_writes: usize,
}

/// In-memory [`TimeSeriesStore`]. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    create_calls: Arc<AtomicUsize>,
    write_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds the given databases.
    pub fn with_databases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store
            .lock()
            .databases
            .extend(names.into_iter().map(Into::into));
        store
    }

    /// Make the next `count` write calls fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    pub fn databases(&self) -> Vec<String> {
        self.lock().databases.iter().cloned().collect()
    }

    /// Successfully written batches, in write order.
    pub fn batches(&self) -> Vec<(String, Vec<Point>)> {
        self.lock().batches.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    /// Write calls, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every mutation completes before the guard drops, so poisoning is ignored.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.databases())
    }

    async fn create_database(&self, name: &str) -> Result<(), StoreError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        self.lock().databases.insert(name.to_string());
        Ok(())
    }

    async fn write_points(&self, database: &str, points: &[Point]) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock();
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        if !state.databases.contains(database) {
            return Err(StoreError::Status {
                status: 404,
                body: format!("database not found: \"{}\"", database),
            });
        }
        state
            .batches
            .push((database.to_string(), points.to_vec()));
        Ok(())
    }
}
