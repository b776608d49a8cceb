// erasure-core/src/infrastructure/adapters/sqlserver.rs

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::domain::datasource::Dialect;
use crate::domain::pagination::Page;
use crate::domain::sql::{TableRef, UpdateStatement};
use crate::error::ErasureError;
use crate::infrastructure::adapters::ConnectionParams;
use crate::infrastructure::error::ConnectorError;
use crate::ports::connector::{KeyedValue, RelationalConnector};

type TdsClient = Client<Compat<TcpStream>>;

pub struct SqlServerConnector {
    params: ConnectionParams,
    trust_server_certificate: bool,
    client: Option<TdsClient>,
}

impl SqlServerConnector {
    pub fn new(params: ConnectionParams, trust_server_certificate: bool) -> Self {
        Self {
            params,
            trust_server_certificate,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut TdsClient, ConnectorError> {
        self.client
            .as_mut()
            .ok_or_else(|| ConnectorError::SqlServer("not connected".to_string()))
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.params.host);
        config.port(self.params.port);
        config.database(&self.params.database);
        config.authentication(AuthMethod::sql_server(
            &self.params.username,
            &self.params.password,
        ));
        if self.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Reads a non-null text cell. A NULL key or a type mismatch is a driver error, never a skipped row.
fn required_text(cell: tiberius::Result<Option<&str>>, what: &str) -> Result<String, ConnectorError> {
    cell?
        .map(str::to_string)
        .ok_or_else(|| ConnectorError::SqlServer(format!("NULL {what}")))
}

fn optional_text(cell: tiberius::Result<Option<&str>>) -> Result<Option<String>, ConnectorError> {
    Ok(cell?.map(str::to_string))
}

async fn run_batch(client: &mut TdsClient, statement: &UpdateStatement) -> Result<(), ConnectorError> {
    for row in &statement.rows {
        let binds: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
        client.execute(statement.sql.as_str(), &binds).await?;
    }
    Ok(())
}

#[async_trait]
impl RelationalConnector for SqlServerConnector {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn connect(&mut self) -> Result<(), ErasureError> {
        if self.client.is_some() {
            return Ok(());
        }
        let config = self.config();
        debug!(addr = %config.get_addr(), db = %self.params.database, "Opening connection");

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| ConnectorError::SqlServer(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| ConnectorError::SqlServer(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(ConnectorError::from)?;
        self.client = Some(client);
        Ok(())
    }

    async fn primary_keys(&mut self, table: &TableRef) -> Result<Vec<String>, ErasureError> {
        let sql = Dialect::SqlServer.primary_keys_query(table.schema.is_some());
        let client = self.client()?;

        let stream = match &table.schema {
            Some(schema) => client.query(sql.as_str(), &[&table.table, schema]).await,
            None => client.query(sql.as_str(), &[&table.table]).await,
        }
        .map_err(ConnectorError::from)?;
        let rows = stream.into_first_result().await.map_err(ConnectorError::from)?;

        let keys = rows
            .iter()
            .map(|row| required_text(row.try_get::<&str, _>(0), "primary key column name"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    async fn count_rows(&mut self, table: &TableRef) -> Result<u64, ErasureError> {
        let sql = Dialect::SqlServer.count_rows(table);
        let row = self
            .client()?
            .query(sql.as_str(), &[])
            .await
            .map_err(ConnectorError::from)?
            .into_row()
            .await
            .map_err(ConnectorError::from)?;
        let count = match row {
            Some(row) => row
                .try_get::<i64, _>(0)
                .map_err(ConnectorError::from)?
                .unwrap_or(0),
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch_batch(
        &mut self,
        table: &TableRef,
        primary_key: &str,
        column: &str,
        page: Page,
    ) -> Result<Vec<KeyedValue>, ErasureError> {
        let sql = Dialect::SqlServer.batch_select(table, primary_key, column);
        debug!(sql = %sql, offset = page.offset, limit = page.fetch_size, "Fetching batch");
        let (offset, limit) = (as_i64(page.offset), as_i64(page.fetch_size));

        let rows = self
            .client()?
            .query(sql.as_str(), &[&offset, &limit])
            .await
            .map_err(ConnectorError::from)?
            .into_first_result()
            .await
            .map_err(ConnectorError::from)?;

        let batch = rows
            .iter()
            .map(|row| {
                let pk = required_text(row.try_get::<&str, _>(0), "unique identifier")?;
                Ok((pk, optional_text(row.try_get::<&str, _>(1))?))
            })
            .collect::<Result<Vec<_>, ConnectorError>>()?;
        Ok(batch)
    }

    async fn run_update(&mut self, statement: &UpdateStatement) -> Result<(), ErasureError> {
        let client = self.client()?;
        client
            .simple_query("BEGIN TRANSACTION")
            .await
            .map_err(ConnectorError::from)?
            .into_results()
            .await
            .map_err(ConnectorError::from)?;

        let (finish, outcome) = match run_batch(client, statement).await {
            Ok(()) => ("COMMIT TRANSACTION", Ok(())),
            Err(e) => ("ROLLBACK TRANSACTION", Err(e)),
        };
        client
            .simple_query(finish)
            .await
            .map_err(ConnectorError::from)?
            .into_results()
            .await
            .map_err(ConnectorError::from)?;

        outcome?;
        debug!(rows = statement.rows.len(), "Update committed");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ErasureError> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(ConnectorError::from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn mismatch() -> tiberius::error::Error {
        tiberius::error::Error::Conversion("cannot interpret I32(Some(7)) as an &str value".into())
    }

    #[test]
    fn test_text_cells() -> Result<()> {
        assert_eq!(required_text(Ok(Some("42")), "unique identifier")?, "42");
        assert_eq!(optional_text(Ok(Some("jane@corp.com")))?, Some("jane@corp.com".to_string()));
        assert_eq!(optional_text(Ok(None))?, None);
        Ok(())
    }

    #[test]
    fn test_null_key_is_an_error() {
        let result = required_text(Ok(None), "unique identifier");
        assert!(matches!(result, Err(ConnectorError::SqlServer(m)) if m == "NULL unique identifier"));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        assert!(matches!(
            required_text(Err(mismatch()), "unique identifier"),
            Err(ConnectorError::SqlServer(_))
        ));
        assert!(matches!(optional_text(Err(mismatch())), Err(ConnectorError::SqlServer(_))));
    }
}
