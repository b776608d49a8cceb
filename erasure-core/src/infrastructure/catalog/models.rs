// erasure-core/src/infrastructure/catalog/models.rs
//
// Wire shapes of the catalog REST API and their conversion into domain types.
// The API is loose about types (flags as "TRUE" strings, categories as a string
// or a list, ids as numbers or strings), so the raw structs absorb that here.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::domain::categories::read_categories;
use crate::domain::datasource::{DataSourceDescriptor, Dialect};
use crate::domain::error::DomainError;
use crate::domain::record::{FieldRecord, MinimizationRequest, RemediationObject};

pub const PENDING_STATE: &str = "Pending";
pub const DELETE_MANUALLY: &str = "Delete Manually";
pub const COMPLETION_ACTION: &str = "Completion Delete Manually";

/// Scalars rendered as text: strings as-is, null as empty, anything else as JSON.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Finds the list in a response: the body itself, `body[key]`, `body.data[key]` or `body.data`.
pub fn extract_list(body: Value, key: &str) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove(key) {
                return items;
            }
            match map.remove("data") {
                Some(data) => extract_list(data, key),
                None => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

// --- MINIMIZATION ---

#[derive(Debug, Deserialize)]
pub struct RawDeleteQuery {
    #[serde(default)]
    pub state: String,
    #[serde(rename = "markedAs", default)]
    pub marked_as: Option<String>,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "fullObjectName")]
    pub full_object_name: String,
    #[serde(rename = "_id", default)]
    pub id: Value,
}

impl RawDeleteQuery {
    fn is_pending_manual_delete(&self) -> bool {
        self.state == PENDING_STATE && self.marked_as.as_deref() == Some(DELETE_MANUALLY)
    }
}

/// Keeps pending "Delete Manually" entries and merges those sharing a request id,
/// in order of first appearance.
pub fn merge_pending_requests(queries: Vec<RawDeleteQuery>) -> Vec<MinimizationRequest> {
    let mut merged: Vec<MinimizationRequest> = Vec::new();
    for query in queries.into_iter().filter(RawDeleteQuery::is_pending_manual_delete) {
        let position = merged.iter().position(|r| r.request_id == query.request_id);
        let request = match position {
            Some(i) => &mut merged[i],
            None => {
                merged.push(MinimizationRequest {
                    request_id: query.request_id.clone(),
                    ..Default::default()
                });
                let last = merged.len() - 1;
                &mut merged[last]
            }
        };
        request.selected_object_names.insert(query.full_object_name);
        let id = scalar_to_string(&query.id);
        if !id.is_empty() {
            request.secondary_ids.push(id);
        }
    }
    merged
}

// --- SAR RECORDS ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCategory {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Text(String),
}

impl RawFlag {
    fn is_set(&self) -> bool {
        match self {
            RawFlag::Bool(b) => *b,
            RawFlag::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSarRecord {
    pub source: String,
    #[serde(rename = "fullObjectName")]
    pub full_object_name: String,
    pub attr_original_name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub category: Option<RawCategory>,
    #[serde(rename = "proximityId", default)]
    pub proximity_id: Value,
    #[serde(default)]
    pub is_primary: Option<RawFlag>,
    #[serde(default)]
    pub identity_unique_id: Value,
}

impl From<RawSarRecord> for FieldRecord {
    fn from(raw: RawSarRecord) -> Self {
        let value = scalar_to_string(&raw.value);
        let category: BTreeSet<String> = match raw.category {
            Some(RawCategory::One(s)) => read_categories(&s),
            Some(RawCategory::Many(list)) => list
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            None => BTreeSet::new(),
        };
        // The catalog marks the designated identifier by repeating its value.
        let is_identity_unique_id =
            !raw.identity_unique_id.is_null() && scalar_to_string(&raw.identity_unique_id) == value;

        FieldRecord {
            source_name: raw.source,
            full_object_name: raw.full_object_name,
            original_column_name: raw.attr_original_name,
            value,
            category,
            proximity_id: scalar_to_string(&raw.proximity_id),
            is_primary_key: raw.is_primary.as_ref().is_some_and(RawFlag::is_set),
            is_identity_unique_id,
        }
    }
}

// --- DATA SOURCES ---

#[derive(Debug, Deserialize)]
pub struct RawDataSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub rdb_url: Option<String>,
    #[serde(default)]
    pub rdb_name: Option<String>,
}

impl RawDataSource {
    pub fn dialect(&self) -> Result<Dialect, DomainError> {
        Dialect::from_str(&self.kind)
    }

    pub fn into_descriptor(self, name: &str) -> Result<DataSourceDescriptor, DomainError> {
        Ok(DataSourceDescriptor {
            dialect: self.dialect()?,
            name: self.name.unwrap_or_else(|| name.to_string()),
            host_url: self.rdb_url.unwrap_or_default(),
            database: self.rdb_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawDataSourceEnvelope {
    pub ds_connection: RawDataSource,
}

// --- REMEDIATION ---

#[derive(Debug, Default, Deserialize)]
pub struct RawAnnotations {
    #[serde(rename = "actionTaken", default)]
    pub action_taken: Option<String>,
    #[serde(rename = "policyHit", default)]
    pub policy_hit: Vec<String>,
}

/// Item of `remediation/objects`: annotation id and action taken.
#[derive(Debug, Deserialize)]
pub struct RawRemediationObject {
    #[serde(default)]
    pub id: Value,
    #[serde(rename = "fullyQualifiedName")]
    pub fully_qualified_name: String,
    #[serde(default)]
    pub annotations: RawAnnotations,
}

/// Item of `remediation/objects/columns`: per-column policy hits.
#[derive(Debug, Deserialize)]
pub struct RawRemediationColumns {
    #[serde(alias = "fullyQualifiedName")]
    pub fully_qualified_name: String,
    #[serde(default)]
    pub annotations: RawAnnotations,
}

/// Joins the two remediation views on the fully-qualified name.
pub fn join_remediation_views(
    source_name: &str,
    objects: Vec<RawRemediationObject>,
    columns: Vec<RawRemediationColumns>,
) -> Vec<RemediationObject> {
    objects
        .into_iter()
        .map(|obj| {
            let mut policy_hit_columns: Vec<String> = Vec::new();
            for view in columns
                .iter()
                .filter(|c| c.fully_qualified_name == obj.fully_qualified_name)
            {
                for column in &view.annotations.policy_hit {
                    if !policy_hit_columns.contains(column) {
                        policy_hit_columns.push(column.clone());
                    }
                }
            }
            RemediationObject {
                annotation_id: scalar_to_string(&obj.id),
                fully_qualified_name: obj.fully_qualified_name,
                source_name: source_name.to_string(),
                policy_hit_columns,
                action_taken: obj.annotations.action_taken,
            }
        })
        .collect()
}

/// Comment text from an item of `comments/{id}`: `{"comment": ...}` or a bare string.
pub fn comment_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("comment").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_merge_pending_requests() -> Result<()> {
        let body = json!({"data": {"deleteQueries": [
            {"state": "Pending", "markedAs": "Delete Manually", "requestId": "R1",
             "fullObjectName": "db.schema.customers", "_id": "a"},
            {"state": "Pending", "markedAs": "Delete Manually", "requestId": "R2",
             "fullObjectName": "db.schema.orders", "_id": "b"},
            {"state": "Completed", "markedAs": "Delete Manually", "requestId": "R1",
             "fullObjectName": "db.schema.ignored", "_id": "c"},
            {"state": "Pending", "requestId": "R3", "fullObjectName": "db.schema.x", "_id": "d"},
            {"state": "Pending", "markedAs": "Delete Manually", "requestId": "R1",
             "fullObjectName": "db.schema.addresses", "_id": "e"}
        ]}});
        let queries: Vec<RawDeleteQuery> = extract_list(body, "deleteQueries")
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;

        let merged = merge_pending_requests(queries);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].request_id, "R1");
        assert_eq!(merged[0].secondary_ids, vec!["a", "e"]);
        assert!(merged[0].selected_object_names.contains("db.schema.addresses"));
        assert!(!merged[0].selected_object_names.contains("db.schema.ignored"));
        assert_eq!(merged[1].request_id, "R2");
        Ok(())
    }

    #[test]
    fn test_sar_record_conversion() -> Result<()> {
        let raw: RawSarRecord = serde_json::from_value(json!({
            "source": "crm", "fullObjectName": "crm.public.customers",
            "attr_original_name": "id", "value": 42, "category": ["Identifier", " "],
            "proximityId": 7, "is_primary": "TRUE", "identity_unique_id": "42"
        }))?;
        let record = FieldRecord::from(raw);
        assert_eq!(record.value, "42");
        assert_eq!(record.proximity_id, "7");
        assert!(record.is_primary_key);
        assert!(record.is_identity_unique_id);
        assert_eq!(record.category.len(), 1);

        let raw: RawSarRecord = serde_json::from_value(json!({
            "source": "crm", "fullObjectName": "crm.public.customers",
            "attr_original_name": "email", "value": "jane@corp.com", "category": "Email",
            "proximityId": "7", "is_primary": false
        }))?;
        let record = FieldRecord::from(raw);
        assert!(!record.is_primary_key);
        assert!(!record.is_identity_unique_id);
        assert!(record.category.contains("Email"));
        Ok(())
    }

    #[test]
    fn test_data_source_descriptor() -> Result<()> {
        let envelope: RawDataSourceEnvelope = serde_json::from_value(json!({
            "ds_connection": {"rdb_url": "10.0.0.5:3306", "rdb_name": "crm", "type": "rdb-mysql"}
        }))?;
        let descriptor = envelope.ds_connection.into_descriptor("crm")?;
        assert_eq!(descriptor.dialect, Dialect::MySql);
        assert_eq!(descriptor.name, "crm");
        assert_eq!(descriptor.host_url, "10.0.0.5:3306");

        let unsupported: RawDataSource = serde_json::from_value(json!({"type": "s3"}))?;
        assert!(unsupported.into_descriptor("bucket").is_err());
        Ok(())
    }

    #[test]
    fn test_join_remediation_views() -> Result<()> {
        let objects: Vec<RawRemediationObject> = serde_json::from_value(json!([
            {"id": "ann-1", "fullyQualifiedName": "tokendb.TOKEN_USER.CUSTOMERS",
             "annotations": {"actionTaken": "Thales Tokenization"}},
            {"id": "ann-2", "fullyQualifiedName": "tokendb.TOKEN_USER.ORDERS"}
        ]))?;
        let columns: Vec<RawRemediationColumns> = serde_json::from_value(json!([
            {"fully_qualified_name": "tokendb.TOKEN_USER.CUSTOMERS",
             "annotations": {"policyHit": ["SSN", "EMAIL"]}},
            {"fully_qualified_name": "tokendb.TOKEN_USER.CUSTOMERS",
             "annotations": {"policyHit": ["EMAIL", "PHONE"]}}
        ]))?;

        let joined = join_remediation_views("tokendb", objects, columns);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].annotation_id, "ann-1");
        assert_eq!(joined[0].policy_hit_columns, vec!["SSN", "EMAIL", "PHONE"]);
        assert_eq!(joined[0].action_taken.as_deref(), Some("Thales Tokenization"));
        assert!(joined[1].policy_hit_columns.is_empty());
        assert_eq!(joined[1].action_taken, None);
        Ok(())
    }

    #[test]
    fn test_extract_list_shapes() {
        assert_eq!(extract_list(json!([1, 2]), "x").len(), 2);
        assert_eq!(extract_list(json!({"x": [1]}), "x").len(), 1);
        assert_eq!(extract_list(json!({"data": {"x": [1, 2, 3]}}), "x").len(), 3);
        assert_eq!(extract_list(json!({"data": [1]}), "x").len(), 1);
        assert!(extract_list(json!({"other": 1}), "x").is_empty());
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(
            comment_text(&json!({"comment": "Column SSN tokenized by Thales"})).as_deref(),
            Some("Column SSN tokenized by Thales")
        );
        assert_eq!(comment_text(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(comment_text(&json!(3)), None);
    }
}
