// erasure-core/src/application/testing.rs
//
// In-memory ports for pipeline tests.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::domain::action::{ActionParam, ActionParams};
use crate::domain::datasource::{Credential, Credentials, DataSourceDescriptor, Dialect};
use crate::domain::pagination::Page;
use crate::domain::record::{FieldRecord, MinimizationRequest, RemediationObject};
use crate::domain::sql::{TableRef, UpdateStatement};
use crate::error::ErasureError;
use crate::infrastructure::error::{ConnectorError, InfrastructureError};
use crate::ports::catalog::CatalogService;
use crate::ports::connector::{ConnectorFactory, KeyedValue, RelationalConnector};
use crate::ports::tokenizer::{TokenSpec, Tokenizer};

pub fn params(batch_size: Option<&str>) -> ActionParams {
    let mut raw = vec![
        ActionParam::new("CTSUsername", "cts"),
        ActionParam::new("CTSPassword", "pw"),
        ActionParam::new("Categories", "Email, Phone"),
        ActionParam::new("CTSTokengroup", "tg"),
        ActionParam::new("CTSTokentemplate", "alphanum"),
    ];
    if let Some(size) = batch_size {
        raw.push(ActionParam::new("BatchSize", size));
    }
    ActionParams::from_params(&raw).unwrap()
}

pub fn descriptor(name: &str) -> DataSourceDescriptor {
    DataSourceDescriptor {
        name: name.to_string(),
        dialect: Dialect::MySql,
        host_url: "127.0.0.1:3306".to_string(),
        database: name.to_string(),
    }
}

pub fn field(
    source: &str,
    object: &str,
    column: &str,
    value: &str,
    category: &str,
    proximity: &str,
) -> FieldRecord {
    FieldRecord {
        source_name: source.to_string(),
        full_object_name: object.to_string(),
        original_column_name: column.to_string(),
        value: value.to_string(),
        category: BTreeSet::from([category.to_string()]),
        proximity_id: proximity.to_string(),
        is_primary_key: false,
        is_identity_unique_id: false,
    }
}

// --- CATALOG ---

#[derive(Default)]
pub struct MockCatalog {
    pub requests: Vec<MinimizationRequest>,
    pub records: HashMap<String, Vec<FieldRecord>>,
    pub sources: Vec<DataSourceDescriptor>,
    pub remediation: HashMap<String, Vec<RemediationObject>>,
    pub comments: HashMap<String, Vec<String>>,
    pub fail_comments: bool,
    /// Every write, e.g. `complete:R1`, `comment:ann-1:...`.
    pub writes: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn fetch_pending_minimization_requests(
        &self,
    ) -> Result<Vec<MinimizationRequest>, ErasureError> {
        Ok(self.requests.clone())
    }

    async fn fetch_records(&self, request_id: &str) -> Result<Vec<FieldRecord>, ErasureError> {
        Ok(self.records.get(request_id).cloned().unwrap_or_default())
    }

    async fn fetch_data_source(&self, name: &str) -> Result<DataSourceDescriptor, ErasureError> {
        Ok(descriptor(name))
    }

    async fn fetch_reachable_data_sources(
        &self,
        supported: &[Dialect],
    ) -> Result<Vec<DataSourceDescriptor>, ErasureError> {
        Ok(self
            .sources
            .iter()
            .filter(|s| supported.contains(&s.dialect))
            .cloned()
            .collect())
    }

    async fn fetch_credentials(&self, _tpa_id: &str, _name: &str) -> Result<Credentials, ErasureError> {
        let plain = |v: &str| Credential {
            value: v.to_string(),
            encrypted: false,
        };
        Ok(Credentials {
            username: plain("svc"),
            password: plain("pw"),
        })
    }

    async fn fetch_remediation_objects(
        &self,
        source_name: &str,
    ) -> Result<Vec<RemediationObject>, ErasureError> {
        Ok(self.remediation.get(source_name).cloned().unwrap_or_default())
    }

    async fn fetch_object_comments(&self, annotation_id: &str) -> Result<Vec<String>, ErasureError> {
        Ok(self.comments.get(annotation_id).cloned().unwrap_or_default())
    }

    async fn mark_minimization_complete(
        &self,
        request_id: &str,
        secondary_ids: &[String],
    ) -> Result<(), ErasureError> {
        self.writes
            .lock()
            .unwrap()
            .push(format!("complete:{}:{}", request_id, secondary_ids.join(",")));
        Ok(())
    }

    async fn post_comment(&self, annotation_id: &str, comment: &str) -> Result<(), ErasureError> {
        if self.fail_comments {
            return Err(InfrastructureError::CatalogApi {
                status: 500,
                body: "comments down".into(),
            }
            .into());
        }
        self.writes
            .lock()
            .unwrap()
            .push(format!("comment:{}:{}", annotation_id, comment));
        Ok(())
    }

    async fn create_tag(&self, name: &str, _description: &str) -> Result<(), ErasureError> {
        self.writes.lock().unwrap().push(format!("create_tag:{}", name));
        Ok(())
    }

    async fn add_tag(
        &self,
        object: &RemediationObject,
        column: &str,
        tag_name: &str,
    ) -> Result<(), ErasureError> {
        self.writes.lock().unwrap().push(format!(
            "tag:{}:{}:{}",
            object.fully_qualified_name, column, tag_name
        ));
        Ok(())
    }
}

// --- TOKENIZER ---

#[derive(Default)]
pub struct MockTokenizer {
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub fail: bool,
}

impl MockTokenizer {
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tokenizer for MockTokenizer {
    async fn tokenize(&self, values: &[String], _spec: &TokenSpec) -> Result<Vec<String>, ErasureError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.calls.lock().unwrap().push(values.to_vec());
        if self.fail {
            return Err(InfrastructureError::Tokenization("vendor down".into()).into());
        }
        Ok(values
            .iter()
            .map(|v| if v.is_empty() { v.clone() } else { format!("tk_{}", v) })
            .collect())
    }
}

// --- RELATIONAL ---

/// Shared state behind every connector a [`MockFactory`] hands out.
#[derive(Default)]
pub struct MockDb {
    pub primary_keys: Vec<String>,
    pub row_count: u64,
    /// Column values by row index; missing rows read as `value-{i}`.
    pub values: HashMap<u64, Option<String>>,
    pub pages: Vec<Page>,
    pub updates: Vec<UpdateStatement>,
    pub fail_updates: bool,
    pub closes: usize,
}

pub struct MockConnector {
    dialect: Dialect,
    db: Arc<Mutex<MockDb>>,
}

#[async_trait]
impl RelationalConnector for MockConnector {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn connect(&mut self) -> Result<(), ErasureError> {
        Ok(())
    }

    async fn primary_keys(&mut self, _table: &TableRef) -> Result<Vec<String>, ErasureError> {
        Ok(self.db.lock().unwrap().primary_keys.clone())
    }

    async fn count_rows(&mut self, _table: &TableRef) -> Result<u64, ErasureError> {
        Ok(self.db.lock().unwrap().row_count)
    }

    async fn fetch_batch(
        &mut self,
        _table: &TableRef,
        _primary_key: &str,
        _column: &str,
        page: Page,
    ) -> Result<Vec<KeyedValue>, ErasureError> {
        let mut db = self.db.lock().unwrap();
        db.pages.push(page);
        Ok((page.offset..page.offset + page.fetch_size)
            .map(|i| {
                let value = db
                    .values
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| Some(format!("value-{}", i)));
                (i.to_string(), value)
            })
            .collect())
    }

    async fn run_update(&mut self, statement: &UpdateStatement) -> Result<(), ErasureError> {
        let mut db = self.db.lock().unwrap();
        if db.fail_updates {
            return Err(ConnectorError::MySql("deadlock detected".into()).into());
        }
        db.updates.push(statement.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ErasureError> {
        self.db.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFactory {
    pub db: Arc<Mutex<MockDb>>,
    pub opened: Arc<Mutex<Vec<String>>>,
    pub unreachable: HashSet<String>,
}

impl MockFactory {
    pub fn with_db(db: MockDb) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateStatement> {
        self.db.lock().unwrap().updates.clone()
    }

    pub fn pages(&self) -> Vec<(u64, u64)> {
        self.db
            .lock()
            .unwrap()
            .pages
            .iter()
            .map(|p| (p.offset, p.fetch_size))
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.db.lock().unwrap().closes
    }
}

#[async_trait]
impl ConnectorFactory for MockFactory {
    async fn open(
        &self,
        descriptor: &DataSourceDescriptor,
        _credentials: &Credentials,
    ) -> Result<Box<dyn RelationalConnector>, ErasureError> {
        if self.unreachable.contains(&descriptor.name) {
            return Err(ConnectorError::MySql(format!("cannot reach {}", descriptor.name)).into());
        }
        self.opened.lock().unwrap().push(descriptor.name.clone());
        Ok(Box::new(MockConnector {
            dialect: descriptor.dialect,
            db: Arc::clone(&self.db),
        }))
    }
}
