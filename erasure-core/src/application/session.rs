// erasure-core/src/application/session.rs

use tracing::info;

use crate::domain::action::ActionParams;
use crate::domain::datasource::DataSourceDescriptor;
use crate::error::ErasureError;
use crate::infrastructure::config::{AnonymizationSettings, AppConfig, RemediationSettings};
use crate::ports::catalog::CatalogService;
use crate::ports::connector::{ConnectorFactory, RelationalConnector};
use crate::ports::tokenizer::{TokenSpec, Tokenizer};

/// Per-invocation state: the collaborators and parameters of one action run.
/// Built fresh for every trigger, never shared between runs.
pub struct Session<'a> {
    pub catalog: &'a dyn CatalogService,
    pub tokenizer: &'a dyn Tokenizer,
    pub connectors: &'a dyn ConnectorFactory,
    pub tpa_id: String,
    pub params: ActionParams,
    pub token_spec: TokenSpec,
    pub anonymization: AnonymizationSettings,
    pub remediation: RemediationSettings,
}

impl<'a> Session<'a> {
    pub fn new(
        catalog: &'a dyn CatalogService,
        tokenizer: &'a dyn Tokenizer,
        connectors: &'a dyn ConnectorFactory,
        tpa_id: &str,
        params: ActionParams,
        config: &AppConfig,
    ) -> Self {
        Self {
            catalog,
            tokenizer,
            connectors,
            tpa_id: tpa_id.to_string(),
            token_spec: TokenSpec::new(&params.token_group, &params.token_template),
            params,
            anonymization: config.anonymization.clone(),
            remediation: config.remediation.clone(),
        }
    }

    /// Looks the data source up by name, then connects to it.
    pub async fn open_source(
        &self,
        source_name: &str,
    ) -> Result<Box<dyn RelationalConnector>, ErasureError> {
        let descriptor = self.catalog.fetch_data_source(source_name).await?;
        self.open(&descriptor).await
    }

    pub async fn open(
        &self,
        descriptor: &DataSourceDescriptor,
    ) -> Result<Box<dyn RelationalConnector>, ErasureError> {
        let credentials = self
            .catalog
            .fetch_credentials(&self.tpa_id, &descriptor.name)
            .await?;
        let connector = self.connectors.open(descriptor, &credentials).await?;
        info!(source = %descriptor.name, dialect = %descriptor.dialect, "Data source connected");
        Ok(connector)
    }
}
