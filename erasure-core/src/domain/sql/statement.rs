// erasure-core/src/domain/sql/statement.rs

use serde::Serialize;

use crate::domain::datasource::Dialect;
use crate::domain::error::DomainError;
use crate::domain::record::ObjectName;

/// A possibly schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }
}

impl From<&ObjectName> for TableRef {
    fn from(name: &ObjectName) -> Self {
        Self::new(Some(&name.schema), &name.table)
    }
}

/// One column to overwrite with its token, matched on its pre-tokenization value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnUpdate {
    pub column: String,
    pub original: String,
    pub token: String,
}

/// Parameterized DML: one SQL text, one parameter row per execution.
/// A single row is a plain statement; several rows run executemany-style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatement {
    pub sql: String,
    pub rows: Vec<Vec<String>>,
}

/// `UPDATE t SET c1 = :t1 [, c2 = :t2 ...] WHERE c1 = :o1 [AND c2 = :o2 ...] AND uid = :u`
///
/// Every target is matched on its original value as well as on the unique identifier,
/// so a stale or non-unique key can never overwrite another row's data.
pub fn build_update_statement(
    dialect: Dialect,
    table: &TableRef,
    updates: &[ColumnUpdate],
    unique_id_column: &str,
    unique_id_value: &str,
) -> Result<UpdateStatement, DomainError> {
    if updates.is_empty() {
        return Err(DomainError::EmptyUpdate(dialect.qualified_table(table)));
    }

    let mut index = 0;
    let mut next = || {
        index += 1;
        index
    };

    let set_clause = updates
        .iter()
        .map(|u| format!("{} = {}", dialect.quote_ident(&u.column), dialect.placeholder(next())))
        .collect::<Vec<_>>()
        .join(", ");

    let mut conditions: Vec<String> = updates
        .iter()
        .map(|u| dialect.text_equals(&u.column, next()))
        .collect();
    conditions.push(dialect.text_equals(unique_id_column, next()));

    let mut params: Vec<String> = updates.iter().map(|u| u.token.clone()).collect();
    params.extend(updates.iter().map(|u| u.original.clone()));
    params.push(unique_id_value.to_string());

    Ok(UpdateStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            dialect.qualified_table(table),
            set_clause,
            conditions.join(" AND ")
        ),
        rows: vec![params],
    })
}

/// `UPDATE t SET column = :token WHERE primary_key = :pk`, one row per `(token, pk)` pair.
pub fn build_bulk_update(
    dialect: Dialect,
    table: &TableRef,
    column: &str,
    primary_key: &str,
    pairs: Vec<(String, String)>,
) -> UpdateStatement {
    UpdateStatement {
        sql: format!(
            "UPDATE {} SET {} = {} WHERE {}",
            dialect.qualified_table(table),
            dialect.quote_ident(column),
            dialect.placeholder(1),
            dialect.text_equals(primary_key, 2)
        ),
        rows: pairs.into_iter().map(|(token, pk)| vec![token, pk]).collect(),
    }
}
