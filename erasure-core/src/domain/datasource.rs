// erasure-core/src/domain/datasource.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// SQL dialects with an implemented relational connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Oracle,
    Postgres,
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::MySql,
        Dialect::Oracle,
        Dialect::Postgres,
        Dialect::SqlServer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
        }
    }
}

impl FromStr for Dialect {
    type Err = DomainError;

    /// Accepts the catalog's connection types (`rdb-mysql`, ...) as well as bare names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let name = lowered.strip_prefix("rdb-").unwrap_or(&lowered);
        match name {
            "mysql" => Ok(Self::MySql),
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            _ => Err(DomainError::UnsupportedDialect(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a data source lives. `host_url` is `host:port` (`host:port/SID` for Oracle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceDescriptor {
    pub name: String,
    pub dialect: Dialect,
    pub host_url: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub value: String,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Credential,
    pub password: Credential,
}
