// erasure-core/src/ports/connector.rs

// What the pipelines need from a relational database, independent of the driver.
// One implementation per dialect; the factory picks it from the descriptor's dialect tag.

use async_trait::async_trait;

use crate::domain::datasource::{Credentials, DataSourceDescriptor, Dialect};
use crate::domain::pagination::Page;
use crate::domain::sql::{self, ColumnUpdate, TableRef, UpdateStatement};
use crate::error::ErasureError;

/// A `(primary key, column value)` pair read as text. `None` is SQL NULL.
pub type KeyedValue = (String, Option<String>);

#[async_trait]
pub trait RelationalConnector: Send {
    fn dialect(&self) -> Dialect;

    /// Opens the connection. Network or authentication failures are not retried.
    async fn connect(&mut self) -> Result<(), ErasureError>;

    /// Primary-key columns in key order. Empty means the table has no usable key.
    async fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, ErasureError>;

    async fn count_rows(&mut self, table: &TableRef) -> Result<u64, ErasureError>;

    /// One page of `(pk, column)` ordered by the primary key ascending.
    async fn fetch_batch(
        &mut self,
        table: &TableRef,
        primary_key: &str,
        column: &str,
        page: Page,
    ) -> Result<Vec<KeyedValue>, ErasureError>;

    /// Runs every parameter row of the statement in one transaction.
    /// Commits on success, rolls back on the first failure.
    async fn run_update(&mut self, statement: &UpdateStatement) -> Result<(), ErasureError>;

    fn build_update_statement(
        &self,
        table: &TableRef,
        updates: &[ColumnUpdate],
        unique_id_column: &str,
        unique_id_value: &str,
    ) -> Result<UpdateStatement, ErasureError> {
        Ok(sql::build_update_statement(
            self.dialect(),
            table,
            updates,
            unique_id_column,
            unique_id_value,
        )?)
    }

    fn build_bulk_update(
        &self,
        table: &TableRef,
        column: &str,
        primary_key: &str,
        pairs: Vec<(String, String)>,
    ) -> UpdateStatement {
        sql::build_bulk_update(self.dialect(), table, column, primary_key, pairs)
    }

    /// Idempotent. Safe to call on a connector that never connected.
    async fn close(&mut self) -> Result<(), ErasureError>;
}

/// Turns a catalog data source and its credentials into a connected [`RelationalConnector`].
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn open(
        &self,
        descriptor: &DataSourceDescriptor,
        credentials: &Credentials,
    ) -> Result<Box<dyn RelationalConnector>, ErasureError>;
}
