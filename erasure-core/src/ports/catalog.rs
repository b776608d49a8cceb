// erasure-core/src/ports/catalog.rs

use async_trait::async_trait;

use crate::domain::datasource::{Credentials, DataSourceDescriptor, Dialect};
use crate::domain::record::{FieldRecord, MinimizationRequest, RemediationObject};
use crate::error::ErasureError;

/// The data-catalog / privacy-request service.
/// Implementations keep their own session token fresh.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Pending "Delete Manually" requests, merged by request id.
    async fn fetch_pending_minimization_requests(
        &self,
    ) -> Result<Vec<MinimizationRequest>, ErasureError>;

    /// SAR report records for one request.
    async fn fetch_records(&self, request_id: &str) -> Result<Vec<FieldRecord>, ErasureError>;

    async fn fetch_data_source(&self, name: &str) -> Result<DataSourceDescriptor, ErasureError>;

    /// Every registered data source whose dialect is in `supported`.
    async fn fetch_reachable_data_sources(
        &self,
        supported: &[Dialect],
    ) -> Result<Vec<DataSourceDescriptor>, ErasureError>;

    async fn fetch_credentials(
        &self,
        tpa_id: &str,
        source_name: &str,
    ) -> Result<Credentials, ErasureError>;

    async fn fetch_remediation_objects(
        &self,
        source_name: &str,
    ) -> Result<Vec<RemediationObject>, ErasureError>;

    async fn fetch_object_comments(&self, annotation_id: &str) -> Result<Vec<String>, ErasureError>;

    async fn mark_minimization_complete(
        &self,
        request_id: &str,
        secondary_ids: &[String],
    ) -> Result<(), ErasureError>;

    async fn post_comment(&self, annotation_id: &str, comment: &str) -> Result<(), ErasureError>;

    async fn create_tag(&self, name: &str, description: &str) -> Result<(), ErasureError>;

    async fn add_tag(
        &self,
        object: &RemediationObject,
        column: &str,
        tag_name: &str,
    ) -> Result<(), ErasureError>;
}
