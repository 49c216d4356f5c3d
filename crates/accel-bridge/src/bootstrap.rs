// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write-target bootstrap.
//!
//! Runs once before any message is accepted: lists databases, creates the
//! target if absent, and hands back the [`Database`] every write goes to.

use crate::store::{StoreError, TimeSeriesStore};
use std::fmt;
use thiserror::Error;

/// Bootstrap errors. All of them are fatal to the process.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to list databases: {0}")]
    List(#[source] StoreError),

    #[error("failed to create database '{name}': {source}")]
    Create {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("database name is empty")]
    EmptyName,
}

/// A confirmed write target.
///
/// Only [`bootstrap`] produces one, so holding a `Database` means the target
/// was seen or created in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database(String);

impl Database {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ensure `name` exists in `store` and select it as the write target.
pub async fn bootstrap<S>(store: &S, name: &str) -> Result<Database, BootstrapError>
where
    S: TimeSeriesStore + ?Sized,
{
    if name.is_empty() {
        return Err(BootstrapError::EmptyName);
    }

    let existing = store.list_databases().await.map_err(BootstrapError::List)?;

    if existing.iter().any(|db| db == name) {
        tracing::info!("Database '{}' already exists", name);
    } else {
        tracing::info!("Creating database '{}'", name);
        store
            .create_database(name)
            .await
            .map_err(|source| BootstrapError::Create {
                name: name.to_string(),
                source,
            })?;
    }

    tracing::info!("Using database '{}'", name);
    Ok(Database(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_creates_missing_database() {
        let store = MemoryStore::with_databases(["_internal"]);

        let db = bootstrap(&store, "treadmill2").await.expect("bootstrap");

        assert_eq!(db.name(), "treadmill2");
        assert_eq!(store.create_calls(), 1);
        assert!(store.databases().contains(&"treadmill2".to_string()));
    }

    #[tokio::test]
    async fn test_existing_database_not_recreated() {
        let store = MemoryStore::with_databases(["treadmill2"]);

        let first = bootstrap(&store, "treadmill2").await.expect("first");
        let second = bootstrap(&store, "treadmill2").await.expect("second");

        assert_eq!(first, second);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_run_after_creation_is_noop() {
        let store = MemoryStore::new();

        bootstrap(&store, "lab").await.expect("first");
        bootstrap(&store, "lab").await.expect("second");

        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            bootstrap(&store, "").await,
            Err(BootstrapError::EmptyName)
        ));
    }

    struct BrokenStore {
        list_fails: bool,
    }

    #[async_trait]
    impl TimeSeriesStore for BrokenStore {
        async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
            if self.list_fails {
                Err(StoreError::Unavailable("connection refused".into()))
            } else {
                Ok(Vec::new())
            }
        }

        async fn create_database(&self, _name: &str) -> Result<(), StoreError> {
            Err(StoreError::Status {
                status: 403,
                body: "forbidden".into(),
            })
        }

        async fn write_points(
            &self,
            _database: &str,
            _points: &[crate::point::Point],
        ) -> Result<(), StoreError> {
            unreachable!("bootstrap never writes")
        }
    }

    #[tokio::test]
    async fn test_store_errors_are_fatal() {
        let err = bootstrap(&BrokenStore { list_fails: true }, "lab")
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::List(_)));

        let err = bootstrap(&BrokenStore { list_fails: false }, "lab")
            .await
            .unwrap_err();
        match err {
            BootstrapError::Create { name, .. } => assert_eq!(name, "lab"),
            other => panic!("expected Create error, got {:?}", other),
        }
    }
}
