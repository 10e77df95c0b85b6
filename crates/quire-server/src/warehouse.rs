//! The data warehouse behind the query endpoints.
//!
//! Handlers only see the [`Warehouse`] trait; the binary picks
//! [`SqlApiWarehouse`] when credentials are configured and
//! [`UnconfiguredWarehouse`] otherwise, and tests inject fakes.

pub mod sql_api;
pub mod templates;

use futures_util::future::BoxFuture;
use quire_common::{QueryResult, Row};
use serde_json::Value;

use crate::error::WarehouseError;

pub use sql_api::SqlApiWarehouse;
pub use templates::{TEMPLATES, Template};

/// Statement used by `POST /test-connection`.
pub const TEST_QUERY: &str = "SELECT CURRENT_TIMESTAMP() AS current_time, CURRENT_USER() AS current_user";

pub trait Warehouse: Send + Sync {
    /// Open (or validate) the connection. Idempotent.
    fn connect(&self) -> BoxFuture<'_, Result<(), WarehouseError>>;

    /// Run `sql` with positional `binds`, connecting first if needed.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        binds: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryResult, WarehouseError>>;

    fn disconnect(&self) -> BoxFuture<'_, ()>;

    fn is_connected(&self) -> bool;
}

/// Stand-in used when no warehouse credentials are configured: reports
/// `connected: false` and fails every statement.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredWarehouse;

impl Warehouse for UnconfiguredWarehouse {
    fn connect(&self) -> BoxFuture<'_, Result<(), WarehouseError>> {
        Box::pin(async { Err(WarehouseError::NotConfigured) })
    }

    fn execute<'a>(
        &'a self,
        _sql: &'a str,
        _binds: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryResult, WarehouseError>> {
        Box::pin(async { Err(WarehouseError::NotConfigured) })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Assemble a [`QueryResult`] from column names and positional rows.
/// Column names are lower-cased; rows shorter than the header get nulls.
pub fn build_result(columns: &[String], rows: Vec<Vec<Value>>) -> QueryResult {
    let columns: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    let rows: Vec<Row> = rows
        .into_iter()
        .map(|values| {
            let mut values = values.into_iter();
            columns
                .iter()
                .map(|name| (name.clone(), values.next().unwrap_or(Value::Null)))
                .collect()
        })
        .collect();
    QueryResult {
        row_count: rows.len(),
        columns,
        rows,
    }
}
