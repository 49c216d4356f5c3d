// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB 1.x HTTP client.
//!
//! - `GET  /query?q=SHOW DATABASES`
//! - `POST /query?q=CREATE DATABASE "<name>"`
//! - `POST /write?db=<name>` with a Line Protocol body (204 on success)
//!
//! Credentials are sent as HTTP basic auth.

use super::{StoreError, TimeSeriesStore};
use crate::config::InfluxConfig;
use crate::point::{encode_batch, Point};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

// ============================================================================
// InfluxDB API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    fn into_result(self) -> Result<Vec<StatementResult>, StoreError> {
        if let Some(err) = self.error {
            return Err(StoreError::Query(err));
        }
        if let Some(err) = self.results.iter().find_map(|r| r.error.clone()) {
            return Err(StoreError::Query(err));
        }
        Ok(self.results)
    }

    /// Collect the `name` column across all series.
    fn names(self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for result in self.into_result()? {
            for series in result.series {
                let Some(idx) = series.columns.iter().position(|c| c == "name") else {
                    continue;
                };
                names.extend(
                    series
                        .values
                        .iter()
                        .filter_map(|row| row.get(idx)?.as_str().map(str::to_string)),
                );
            }
        }
        Ok(names)
    }
}

// ============================================================================
// Client
// ============================================================================

/// InfluxDB 1.x client.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

impl InfluxClient {
    /// Build a client from configuration. No request is made here.
    pub fn new(config: &InfluxConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            base_url: config.url(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn query(&self, statement: &str, post: bool) -> Result<QueryResponse, StoreError> {
        let url = self.endpoint("query");
        let request = if post {
            self.client.post(&url)
        } else {
            self.client.get(&url)
        };

        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("q", statement)])
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<QueryResponse>().await?)
    }
}

/// Map non-2xx responses to [`StoreError::Status`], keeping the body for logs.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

/// Quote an identifier for InfluxQL (`"name"` with inner quotes escaped).
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl TimeSeriesStore for InfluxClient {
    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        self.query("SHOW DATABASES", false).await?.names()
    }

    async fn create_database(&self, name: &str) -> Result<(), StoreError> {
        let statement = format!("CREATE DATABASE {}", quote_ident(name));
        self.query(&statement, true).await?.into_result()?;
        Ok(())
    }

    async fn write_points(&self, database: &str, points: &[Point]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.endpoint("write"))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("db", database)])
            .header("content-type", "text/plain; charset=utf-8")
            .body(encode_batch(points))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
