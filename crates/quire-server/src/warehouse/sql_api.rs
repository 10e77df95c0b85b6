//! [`Warehouse`] over the warehouse's SQL REST API (`POST /api/v2/statements`).
//!
//! The API is stateless, so "connecting" means running a probe statement and
//! remembering that it succeeded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use quire_common::QueryResult;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{debug, info, warn};

use super::{Warehouse, build_result};
use crate::config::SqlApiConfig;
use crate::error::WarehouseError;

#[derive(Debug)]
pub struct SqlApiWarehouse {
    client: reqwest::Client,
    config: SqlApiConfig,
    connected: AtomicBool,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding>,
}

/// A positional bind, keyed `"1"`, `"2"`, ... in the request.
#[derive(Debug, PartialEq, Serialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: Option<String>,
}

impl From<&Value> for Binding {
    fn from(value: &Value) -> Self {
        let (kind, value) = match value {
            Value::Null => ("TEXT", None),
            Value::Bool(b) => ("BOOLEAN", Some(b.to_string())),
            Value::Number(n) if n.is_f64() => ("REAL", Some(n.to_string())),
            Value::Number(n) => ("FIXED", Some(n.to_string())),
            Value::String(s) => ("TEXT", Some(s.clone())),
            other => ("TEXT", Some(other.to_string())),
        };
        Self { kind, value }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<ColumnType>,
    /// One entry per result partition; the first arrives inline.
    #[serde(default)]
    partition_info: Vec<Value>,
}

/// Body of `GET /api/v2/statements/{handle}?partition={n}`.
#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    scale: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl ColumnType {
    /// Cells arrive as strings; numbers and booleans are recovered from the
    /// declared column type.
    fn decode(&self, raw: Option<String>) -> Value {
        let Some(raw) = raw else {
            return Value::Null;
        };
        match self.kind.to_ascii_lowercase().as_str() {
            "fixed" if self.scale.unwrap_or(0) == 0 => {
                raw.parse::<i64>().map(Value::from).unwrap_or(Value::String(raw))
            }
            "fixed" | "real" => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(raw)),
            "boolean" => match raw.as_str() {
                "true" | "TRUE" | "1" => Value::Bool(true),
                "false" | "FALSE" | "0" => Value::Bool(false),
                _ => Value::String(raw),
            },
            _ => Value::String(raw),
        }
    }
}

impl SqlApiWarehouse {
    pub fn new(config: SqlApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            connected: AtomicBool::new(false),
        }
    }

    /// Map a non-success response to an error, dropping the connected flag
    /// when the token was refused.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, WarehouseError> {
        let status = response.status();
        if status == reqwest::StatusCode::ACCEPTED {
            return Err(WarehouseError::Response(format!(
                "statement still running after {}s",
                self.config.timeout.as_secs()
            )));
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.to_string());
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.connected.store(false, Ordering::Release);
            }
            return Err(WarehouseError::Statement {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Rows of result partition `partition` (1-based after the inline one).
    async fn partition(
        &self,
        handle: &str,
        partition: usize,
    ) -> Result<Vec<Vec<Option<String>>>, WarehouseError> {
        let mut url = self.config.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| WarehouseError::Response("endpoint cannot be a base".into()))?
            .pop_if_empty()
            .push(handle);
        url.query_pairs_mut()
            .append_pair("partition", &partition.to_string());

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(WarehouseError::Http)?;
        let body: PartitionResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(WarehouseError::Http)?;
        Ok(body.data)
    }

    async fn submit(&self, sql: &str, binds: &[Value]) -> Result<QueryResult, WarehouseError> {
        let request = StatementRequest {
            statement: sql,
            timeout: self.config.timeout.as_secs(),
            database: self.config.database.as_deref(),
            schema: self.config.schema.as_deref(),
            warehouse: self.config.warehouse.as_deref(),
            role: self.config.role.as_deref(),
            bindings: binds
                .iter()
                .enumerate()
                .map(|(i, value)| ((i + 1).to_string(), Binding::from(value)))
                .collect(),
        };
        debug!(statement = sql, binds = binds.len(), "submitting statement");

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                self.connected.store(false, Ordering::Release);
                WarehouseError::Http(e)
            })?;

        let response = self.check(response).await?;
        let body: StatementResponse = response.json().await.map_err(WarehouseError::Http)?;
        let meta = body
            .result_set_meta_data
            .ok_or_else(|| WarehouseError::Response("missing resultSetMetaData".into()))?;

        let mut cells = body.data;
        if meta.partition_info.len() > 1 {
            let handle = body.statement_handle.ok_or_else(|| {
                WarehouseError::Response("partitioned result without statementHandle".into())
            })?;
            debug!(partitions = meta.partition_info.len(), %handle, "fetching result partitions");
            for partition in 1..meta.partition_info.len() {
                cells.extend(self.partition(&handle, partition).await?);
            }
        }

        let names: Vec<String> = meta.row_type.iter().map(|c| c.name.clone()).collect();
        let rows = cells
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .zip(&meta.row_type)
                    .map(|(raw, column)| column.decode(raw))
                    .collect()
            })
            .collect();
        let result = build_result(&names, rows);
        debug!(rows = result.row_count, "statement complete");
        Ok(result)
    }
}

impl Warehouse for SqlApiWarehouse {
    fn connect(&self) -> BoxFuture<'_, Result<(), WarehouseError>> {
        Box::pin(async move {
            if self.is_connected() {
                return Ok(());
            }
            info!(endpoint = %self.config.endpoint, user = ?self.config.user, "connecting to warehouse");
            match self.submit("SELECT 1", &[]).await {
                Ok(_) => {
                    self.connected.store(true, Ordering::Release);
                    info!("warehouse connected");
                    Ok(())
                }
                Err(err) => {
                    warn!(%err, "warehouse connection failed");
                    Err(err)
                }
            }
        })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        binds: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryResult, WarehouseError>> {
        Box::pin(async move {
            self.connect().await?;
            self.submit(sql, binds).await
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.connected.swap(false, Ordering::AcqRel) {
                info!("warehouse disconnected");
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
