// erasure-core/src/infrastructure/adapters/mysql.rs

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::debug;

use crate::domain::datasource::Dialect;
use crate::domain::pagination::Page;
use crate::domain::sql::{TableRef, UpdateStatement};
use crate::error::ErasureError;
use crate::infrastructure::adapters::ConnectionParams;
use crate::infrastructure::error::ConnectorError;
use crate::ports::connector::{KeyedValue, RelationalConnector};

fn mysql_err(err: sqlx::Error) -> ConnectorError {
    ConnectorError::MySql(err.to_string())
}

pub struct MySqlConnector {
    params: ConnectionParams,
    conn: Option<MySqlConnection>,
}

impl MySqlConnector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params, conn: None }
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection, ConnectorError> {
        self.conn
            .as_mut()
            .ok_or_else(|| ConnectorError::MySql("not connected".to_string()))
    }
}

#[async_trait]
impl RelationalConnector for MySqlConnector {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn connect(&mut self) -> Result<(), ErasureError> {
        if self.conn.is_some() {
            return Ok(());
        }
        debug!(host = %self.params.host, db = %self.params.database, "Opening connection");
        let options = MySqlConnectOptions::new()
            .host(&self.params.host)
            .port(self.params.port)
            .username(&self.params.username)
            .password(&self.params.password)
            .database(&self.params.database);
        self.conn = Some(options.connect().await.map_err(mysql_err)?);
        Ok(())
    }

    async fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, ErasureError> {
        let sql = Dialect::MySql.primary_keys_query(table.schema.is_some());
        let conn = self.conn()?;
        let mut query = sqlx::query_scalar::<_, String>(&sql).bind(&table.table);
        if let Some(schema) = &table.schema {
            query = query.bind(schema);
        }
        Ok(query.fetch_all(conn).await.map_err(mysql_err)?)
    }

    async fn count_rows(&mut self, table: &TableRef) -> Result<u64, ErasureError> {
        let sql = Dialect::MySql.count_rows(table);
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(self.conn()?)
            .await
            .map_err(mysql_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch_batch(
        &mut self,
        table: &TableRef,
        primary_key: &str,
        column: &str,
        page: Page,
    ) -> Result<Vec<KeyedValue>, ErasureError> {
        let sql = Dialect::MySql.batch_select(table, primary_key, column);
        debug!(sql = %sql, offset = page.offset, limit = page.fetch_size, "Fetching batch");
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(&sql)
            .bind(i64::try_from(page.fetch_size).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
            .fetch_all(self.conn()?)
            .await
            .map_err(mysql_err)?;
        Ok(rows)
    }

    async fn run_update(&mut self, statement: &UpdateStatement) -> Result<(), ErasureError> {
        let conn = self.conn()?;
        let mut tx = conn.begin().await.map_err(mysql_err)?;

        let mut outcome = Ok(());
        for row in &statement.rows {
            let mut query = sqlx::query(&statement.sql);
            for value in row {
                query = query.bind(value);
            }
            if let Err(e) = query.execute(&mut *tx).await {
                outcome = Err(mysql_err(e));
                break;
            }
        }

        match outcome {
            Ok(()) => tx.commit().await.map_err(mysql_err)?,
            Err(e) => {
                tx.rollback().await.map_err(mysql_err)?;
                return Err(e.into());
            }
        }
        debug!(rows = statement.rows.len(), "Update committed");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ErasureError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(mysql_err)?;
        }
        Ok(())
    }
}
