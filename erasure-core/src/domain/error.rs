// erasure-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration Error: {0}")]
    #[diagnostic(
        code(erasure::domain::configuration),
        help("Check the action parameters sent by the catalog (e.g. BatchSize must be a positive integer).")
    )]
    Configuration(String),

    #[error("Missing action parameter '{0}'")]
    #[diagnostic(code(erasure::domain::missing_parameter))]
    MissingParameter(String),

    #[error("Invalid object name '{0}': expected dot-separated [source.]schema.table")]
    #[diagnostic(code(erasure::domain::object_name))]
    InvalidObjectName(String),

    #[error("Unsupported data source dialect: {0}")]
    #[diagnostic(
        code(erasure::domain::dialect),
        help("Supported dialects are mysql, oracle, postgres and sqlserver.")
    )]
    UnsupportedDialect(String),

    #[error("Refusing to build an UPDATE on {0} without any target column")]
    #[diagnostic(code(erasure::domain::empty_update))]
    EmptyUpdate(String),

    #[error("No such action: {0}")]
    #[diagnostic(code(erasure::domain::unknown_action))]
    UnknownAction(String),
}
