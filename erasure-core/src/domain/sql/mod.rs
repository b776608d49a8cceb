// erasure-core/src/domain/sql/mod.rs

pub mod dialect;
pub mod statement;

pub use statement::{ColumnUpdate, TableRef, UpdateStatement, build_bulk_update, build_update_statement};
