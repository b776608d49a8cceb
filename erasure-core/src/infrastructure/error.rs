// erasure-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Driver failures, one variant per dialect, carrying the driver's message.
#[derive(Error, Debug, Diagnostic)]
pub enum ConnectorError {
    #[error("MySQL Connector Error: {0}")]
    #[diagnostic(code(erasure::infra::connector::mysql))]
    MySql(String),

    #[error("PostgreSQL Connector Error: {0}")]
    #[diagnostic(code(erasure::infra::connector::postgres))]
    Postgres(String),

    #[error("Oracle Connector Error: {0}")]
    #[diagnostic(
        code(erasure::infra::connector::oracle),
        help("The Oracle connector needs the Oracle Instant Client libraries at runtime.")
    )]
    Oracle(String),

    #[error("SQL Server Connector Error: {0}")]
    #[diagnostic(code(erasure::infra::connector::sqlserver))]
    SqlServer(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATA SOURCES ---
    #[error("Credential Error: {0}")]
    #[diagnostic(
        code(erasure::infra::credential),
        help("Check the encryption key and the data source host URL (host:port, or host:port/SID for Oracle).")
    )]
    Credential(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Connector(#[from] ConnectorError),

    // --- REMOTE SERVICES ---
    #[error("Tokenization Error: {0}")]
    #[diagnostic(code(erasure::infra::tokenization))]
    Tokenization(String),

    #[error("Catalog API Error (HTTP {status}): {body}")]
    #[diagnostic(code(erasure::infra::catalog))]
    CatalogApi { status: u16, body: String },

    #[error("HTTP Error: {0}")]
    #[diagnostic(
        code(erasure::infra::http),
        help("The remote service could not be reached (timeout, TLS or DNS failure).")
    )]
    Http(#[from] reqwest::Error),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(erasure::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- SERIALIZATION ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(erasure::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(erasure::infra::json))]
    Json(#[from] serde_json::Error),

    // --- CONFIG ---
    #[error("Configuration Error: {0}")]
    #[diagnostic(code(erasure::infra::config))]
    ConfigError(String),

    #[error("Configuration not found at '{0}'")]
    #[diagnostic(code(erasure::infra::config_missing))]
    ConfigNotFound(String),
}

// Shortcuts for `?` on driver calls inside the adapters.
impl From<tiberius::error::Error> for ConnectorError {
    fn from(err: tiberius::error::Error) -> Self {
        ConnectorError::SqlServer(err.to_string())
    }
}

impl From<oracle::Error> for ConnectorError {
    fn from(err: oracle::Error) -> Self {
        ConnectorError::Oracle(err.to_string())
    }
}
