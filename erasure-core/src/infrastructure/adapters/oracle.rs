// erasure-core/src/infrastructure/adapters/oracle.rs
//
// The `oracle` driver is blocking (OCI). Every driver call, connect included,
// runs on tokio's blocking pool with the connection behind a mutex.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oracle::Connection;
use oracle::sql_type::ToSql;
use tokio::task;
use tracing::debug;

use crate::domain::datasource::Dialect;
use crate::domain::pagination::Page;
use crate::domain::sql::{TableRef, UpdateStatement};
use crate::error::ErasureError;
use crate::infrastructure::adapters::ConnectionParams;
use crate::infrastructure::error::ConnectorError;
use crate::ports::connector::{KeyedValue, RelationalConnector};

type SharedConnection = Arc<Mutex<Connection>>;

pub struct OracleConnector {
    params: ConnectionParams,
    conn: Option<SharedConnection>,
}

impl OracleConnector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params, conn: None }
    }

    fn conn(&self) -> Result<SharedConnection, ConnectorError> {
        self.conn
            .clone()
            .ok_or_else(|| ConnectorError::Oracle("not connected".to_string()))
    }

    fn connect_string(&self) -> String {
        format!(
            "//{}:{}/{}",
            self.params.host, self.params.port, self.params.database
        )
    }
}

/// Runs `f` against the locked resource on the blocking pool.
async fn run_blocking<R, T, F>(resource: Arc<Mutex<R>>, f: F) -> Result<T, ConnectorError>
where
    R: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&R) -> Result<T, oracle::Error> + Send + 'static,
{
    task::spawn_blocking(move || {
        let guard = resource
            .lock()
            .map_err(|_| ConnectorError::Oracle("connection lock poisoned".to_string()))?;
        f(&guard).map_err(ConnectorError::from)
    })
    .await
    .map_err(|e| ConnectorError::Oracle(format!("driver task failed: {e}")))?
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl RelationalConnector for OracleConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn connect(&mut self) -> Result<(), ErasureError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let dsn = self.connect_string();
        debug!(dsn = %dsn, user = %self.params.username, "Opening connection");
        let (user, password) = (self.params.username.clone(), self.params.password.clone());
        let conn = task::spawn_blocking(move || Connection::connect(user, password, dsn))
            .await
            .map_err(|e| ConnectorError::Oracle(format!("driver task failed: {e}")))?
            .map_err(ConnectorError::from)?;
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    async fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, ErasureError> {
        let sql = Dialect::Oracle.primary_keys_query(table.schema.is_some());
        // Same folding as the quoted names in generated statements.
        let table_name = Dialect::Oracle.fold_ident(&table.table);
        let owner = table.schema.as_deref().map(|s| Dialect::Oracle.fold_ident(s));

        let keys = run_blocking(self.conn()?, move |conn| {
            let rows = match &owner {
                Some(owner) => conn.query_as::<String>(&sql, &[&table_name, owner])?,
                None => conn.query_as::<String>(&sql, &[&table_name])?,
            };
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await?;
        Ok(keys)
    }

    async fn count_rows(&mut self, table: &TableRef) -> Result<u64, ErasureError> {
        let sql = Dialect::Oracle.count_rows(table);
        let count = run_blocking(self.conn()?, move |conn| {
            conn.query_row_as::<i64>(&sql, &[])
        })
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch_batch(
        &mut self,
        table: &TableRef,
        primary_key: &str,
        column: &str,
        page: Page,
    ) -> Result<Vec<KeyedValue>, ErasureError> {
        let sql = Dialect::Oracle.batch_select(table, primary_key, column);
        debug!(sql = %sql, offset = page.offset, limit = page.fetch_size, "Fetching batch");
        let (offset, limit) = (as_i64(page.offset), as_i64(page.fetch_size));

        let batch = run_blocking(self.conn()?, move |conn| {
            conn.query_as::<(String, Option<String>)>(&sql, &[&offset, &limit])?
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
        Ok(batch)
    }

    async fn run_update(&mut self, statement: &UpdateStatement) -> Result<(), ErasureError> {
        let (sql, rows) = (statement.sql.clone(), statement.rows.clone());
        let count = rows.len();

        // The driver does not autocommit: every row runs in the same transaction.
        run_blocking(self.conn()?, move |conn| {
            for row in &rows {
                let binds: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
                if let Err(e) = conn.execute(&sql, &binds) {
                    conn.rollback()?;
                    return Err(e);
                }
            }
            conn.commit()
        })
        .await?;
        debug!(rows = count, "Update committed");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ErasureError> {
        if let Some(conn) = self.conn.take() {
            run_blocking(conn, |conn| conn.close()).await?;
        }
        Ok(())
    }
}
