// erasure-core/src/domain/record.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::error::DomainError;

/// One personal-data field instance discovered by the catalog (one SAR record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub source_name: String,
    /// `connection.schema.table`
    pub full_object_name: String,
    pub original_column_name: String,
    pub value: String,
    pub category: BTreeSet<String>,
    /// Groups the records that belong to the same logical source row.
    pub proximity_id: String,
    pub is_primary_key: bool,
    pub is_identity_unique_id: bool,
}

impl FieldRecord {
    pub fn object_name(&self) -> Result<ObjectName, DomainError> {
        ObjectName::parse(&self.full_object_name)
    }
}

/// A pending "Delete Manually" minimization request, merged by request id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinimizationRequest {
    pub request_id: String,
    pub selected_object_names: BTreeSet<String>,
    /// Catalog-internal ids, needed to mark the request complete.
    pub secondary_ids: Vec<String>,
}

impl MinimizationRequest {
    pub fn is_selected(&self, record: &FieldRecord) -> bool {
        self.selected_object_names.contains(&record.full_object_name)
    }
}

/// A table flagged by a policy scan, joined from the catalog's object and column views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationObject {
    pub fully_qualified_name: String,
    pub source_name: String,
    pub policy_hit_columns: Vec<String>,
    pub annotation_id: String,
    pub action_taken: Option<String>,
}

impl RemediationObject {
    pub fn is_tokenization_requested(&self, sentinel: &str) -> bool {
        self.action_taken.as_deref() == Some(sentinel)
    }

    pub fn object_name(&self) -> Result<ObjectName, DomainError> {
        ObjectName::parse(&self.fully_qualified_name)
    }
}

/// Parsed `[source.]schema.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub source: Option<String>,
    pub schema: String,
    pub table: String,
}

impl ObjectName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(DomainError::InvalidObjectName(raw.to_string()));
        }
        match parts.as_slice() {
            [source, schema, table] => Ok(Self {
                source: Some(source.to_string()),
                schema: schema.to_string(),
                table: table.to_string(),
            }),
            [schema, table] => Ok(Self {
                source: None,
                schema: schema.to_string(),
                table: table.to_string(),
            }),
            _ => Err(DomainError::InvalidObjectName(raw.to_string())),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
