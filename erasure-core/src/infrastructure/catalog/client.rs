// erasure-core/src/infrastructure/catalog/client.rs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::datasource::{Credentials, DataSourceDescriptor, Dialect};
use crate::domain::record::{FieldRecord, MinimizationRequest, RemediationObject};
use crate::error::ErasureError;
use crate::infrastructure::catalog::models::{
    self, COMPLETION_ACTION, RawDataSource, RawDataSourceEnvelope, RawDeleteQuery,
    RawRemediationColumns, RawRemediationObject, RawSarRecord,
};
use crate::infrastructure::config::{CatalogSettings, HttpSettings};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::http::{RetryPolicy, build_client, send_with_retry};
use crate::ports::catalog::CatalogService;

const ACTION_REASON: &str = "Thales data anonymization";

struct SessionToken {
    value: String,
    issued_at: Instant,
}

/// HTTP client for the catalog REST API, bound to one base URL for one invocation.
/// The session token is obtained from the long-lived user token and refreshed once
/// older than the configured TTL.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    user_token: String,
    token_ttl: Duration,
    retry: RetryPolicy,
    session: Mutex<Option<SessionToken>>,
}

impl CatalogClient {
    pub fn new(
        base_url: &str,
        user_token: &str,
        client: Client,
        retry: RetryPolicy,
        token_ttl: Duration,
    ) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Self {
            client,
            base_url,
            user_token: user_token.to_string(),
            token_ttl,
            retry,
            session: Mutex::new(None),
        }
    }

    pub fn from_settings(
        base_url: &str,
        user_token: &str,
        catalog: &CatalogSettings,
        http: &HttpSettings,
    ) -> Result<Self, InfrastructureError> {
        let client = build_client(http, None, catalog.accept_invalid_certs)?;
        Ok(Self::new(
            base_url,
            user_token,
            client,
            RetryPolicy::from_settings(http),
            Duration::from_secs(catalog.access_token_ttl_hours.saturating_mul(3600)),
        ))
    }

    // --- SESSION ---

    async fn access_token(&self) -> Result<String, InfrastructureError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            if token.issued_at.elapsed() < self.token_ttl {
                return Ok(token.value.clone());
            }
        }

        let request = self
            .client
            .get(format!("{}refresh-access-token", self.base_url))
            .header("Accept", "application/json")
            .header("Authorization", &self.user_token);
        let body: Value = self.read_json(request).await?;
        let value = body
            .get("systemToken")
            .and_then(Value::as_str)
            .ok_or_else(|| InfrastructureError::CatalogApi {
                status: 200,
                body: "refresh-access-token response has no systemToken".to_string(),
            })?
            .to_string();

        info!("Catalog session token updated");
        *session = Some(SessionToken {
            value: value.clone(),
            issued_at: Instant::now(),
        });
        Ok(value)
    }

    // --- TRANSPORT ---

    async fn read_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, InfrastructureError> {
        let response = send_with_retry(request, &self.retry).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Catalog request failed");
            return Err(InfrastructureError::CatalogApi {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, InfrastructureError> {
        let token = self.access_token().await?;
        debug!(path, "GET catalog");
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("Accept", "application/json")
            .header("Authorization", token);
        self.read_json(request).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, InfrastructureError> {
        let token = self.access_token().await?;
        debug!(path, "POST catalog");
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("Authorization", token)
            .json(body);
        let reply: Value = self.read_json(request).await?;

        // Some action endpoints answer 200 with the real status in the body.
        if let Some(code) = reply.get("statusCode").and_then(Value::as_u64) {
            if code != 200 {
                return Err(InfrastructureError::CatalogApi {
                    status: u16::try_from(code).unwrap_or(u16::MAX),
                    body: reply
                        .get("message")
                        .map(models::scalar_to_string)
                        .unwrap_or_else(|| reply.to_string()),
                });
            }
        }
        Ok(reply)
    }

    fn parse_items<T: DeserializeOwned>(body: Value, key: &str) -> Result<Vec<T>, InfrastructureError> {
        models::extract_list(body, key)
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(InfrastructureError::from))
            .collect()
    }
}

#[async_trait]
impl CatalogService for CatalogClient {
    #[instrument(skip(self))]
    async fn fetch_pending_minimization_requests(
        &self,
    ) -> Result<Vec<MinimizationRequest>, ErasureError> {
        let body = self.get("data-minimization/objects", &[]).await?;
        let queries: Vec<RawDeleteQuery> = Self::parse_items(body, "deleteQueries")?;
        let requests = models::merge_pending_requests(queries);
        info!(count = requests.len(), "Fetched minimization requests");
        Ok(requests)
    }

    #[instrument(skip(self))]
    async fn fetch_records(&self, request_id: &str) -> Result<Vec<FieldRecord>, ErasureError> {
        let body = self.get(&format!("sar/reports/{}", request_id), &[]).await?;
        let records: Vec<RawSarRecord> = Self::parse_items(body, "records")?;
        info!(count = records.len(), "Fetched SAR report");
        Ok(records.into_iter().map(FieldRecord::from).collect())
    }

    async fn fetch_data_source(&self, name: &str) -> Result<DataSourceDescriptor, ErasureError> {
        let body = self.get(&format!("ds_connections/{}", name), &[]).await?;
        let envelope: RawDataSourceEnvelope =
            serde_json::from_value(body).map_err(InfrastructureError::from)?;
        Ok(envelope.ds_connection.into_descriptor(name)?)
    }

    #[instrument(skip(self))]
    async fn fetch_reachable_data_sources(
        &self,
        supported: &[Dialect],
    ) -> Result<Vec<DataSourceDescriptor>, ErasureError> {
        let body = self.get("ds_connections", &[]).await?;
        let all: Vec<RawDataSource> = Self::parse_items(body, "ds_connections")?;

        let mut reachable = Vec::new();
        for raw in all {
            let Some(name) = raw.name.clone() else {
                continue;
            };
            match raw.dialect() {
                Ok(dialect) if supported.contains(&dialect) => {}
                _ => {
                    debug!(source = %name, kind = %raw.kind, "Data source type has no connector");
                    continue;
                }
            }
            // The listing may omit connection details; the single-source view has them.
            let descriptor = if raw.rdb_url.is_some() {
                raw.into_descriptor(&name)?
            } else {
                self.fetch_data_source(&name).await?
            };
            reachable.push(descriptor);
        }
        info!(count = reachable.len(), "Reachable data sources");
        Ok(reachable)
    }

    async fn fetch_credentials(
        &self,
        tpa_id: &str,
        source_name: &str,
    ) -> Result<Credentials, ErasureError> {
        let body = self
            .get(&format!("tpa/{}/credentials/{}", tpa_id, source_name), &[])
            .await?;
        Ok(serde_json::from_value(body).map_err(InfrastructureError::from)?)
    }

    #[instrument(skip(self))]
    async fn fetch_remediation_objects(
        &self,
        source_name: &str,
    ) -> Result<Vec<RemediationObject>, ErasureError> {
        let query = [("source", source_name)];
        let objects: Vec<RawRemediationObject> =
            Self::parse_items(self.get("remediation/objects", &query).await?, "objects")?;
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let columns: Vec<RawRemediationColumns> = Self::parse_items(
            self.get("remediation/objects/columns", &query).await?,
            "objects",
        )?;
        Ok(models::join_remediation_views(source_name, objects, columns))
    }

    async fn fetch_object_comments(&self, annotation_id: &str) -> Result<Vec<String>, ErasureError> {
        let body = self.get(&format!("comments/{}", annotation_id), &[]).await?;
        Ok(models::extract_list(body, "comments")
            .iter()
            .filter_map(models::comment_text)
            .collect())
    }

    #[instrument(skip(self, secondary_ids))]
    async fn mark_minimization_complete(
        &self,
        request_id: &str,
        secondary_ids: &[String],
    ) -> Result<(), ErasureError> {
        let mut filter = vec![json!({
            "field": "requestId",
            "operator": "equal",
            "value": request_id,
        })];
        if !secondary_ids.is_empty() {
            filter.push(json!({
                "field": "_id",
                "operator": "in",
                "value": secondary_ids,
            }));
        }
        let body = json!({
            "query": { "filter": filter },
            "actionType": COMPLETION_ACTION,
            "reason": ACTION_REASON,
        });
        self.post("data-minimization/objects/action", &body).await?;
        info!("Minimization request marked complete");
        Ok(())
    }

    async fn post_comment(&self, annotation_id: &str, comment: &str) -> Result<(), ErasureError> {
        self.post(
            &format!("comments/{}", annotation_id),
            &json!({ "comment": comment }),
        )
        .await?;
        Ok(())
    }

    async fn create_tag(&self, name: &str, description: &str) -> Result<(), ErasureError> {
        self.post(
            "data-catalog/tags",
            &json!({ "name": name, "description": description }),
        )
        .await?;
        Ok(())
    }

    async fn add_tag(
        &self,
        object: &RemediationObject,
        column: &str,
        tag_name: &str,
    ) -> Result<(), ErasureError> {
        self.post(
            "data-catalog/tags/objects",
            &json!({
                "fullyQualifiedName": object.fully_qualified_name,
                "source": object.source_name,
                "columnName": column,
                "tagName": tag_name,
            }),
        )
        .await?;
        Ok(())
    }
}
