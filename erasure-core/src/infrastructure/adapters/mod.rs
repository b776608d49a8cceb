// erasure-core/src/infrastructure/adapters/mod.rs

pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlserver;

use std::fmt;

use crate::domain::datasource::Dialect;
use crate::infrastructure::config::SqlServerSettings;
use crate::ports::connector::RelationalConnector;

pub use mysql::MySqlConnector;
pub use oracle::OracleConnector;
pub use postgres::PostgresConnector;
pub use sqlserver::SqlServerConnector;

/// Everything a driver needs to open one connection, credentials already decrypted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    /// Database name, or the SID for Oracle.
    pub database: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Picks the connector variant from the dialect tag. The connector is returned unconnected.
pub fn connector_for(
    dialect: Dialect,
    params: ConnectionParams,
    sqlserver: &SqlServerSettings,
) -> Box<dyn RelationalConnector> {
    match dialect {
        Dialect::MySql => Box::new(MySqlConnector::new(params)),
        Dialect::Postgres => Box::new(PostgresConnector::new(params)),
        Dialect::Oracle => Box::new(OracleConnector::new(params)),
        Dialect::SqlServer => Box::new(SqlServerConnector::new(
            params,
            sqlserver.trust_server_certificate,
        )),
    }
}
