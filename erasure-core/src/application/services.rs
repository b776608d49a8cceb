// erasure-core/src/application/services.rs

use tracing::debug;

use crate::application::action::ServiceProvider;
use crate::domain::action::ActionParams;
use crate::error::ErasureError;
use crate::infrastructure::catalog::CatalogClient;
use crate::infrastructure::config::{AppConfig, read_user_token};
use crate::infrastructure::credentials::CredentialResolver;
use crate::infrastructure::tokenization::CtsTokenizer;
use crate::ports::catalog::CatalogService;
use crate::ports::connector::ConnectorFactory;
use crate::ports::tokenizer::Tokenizer;

/// Production wiring: HTTP clients and database drivers built from the loaded configuration.
#[derive(Debug, Clone)]
pub struct LiveServices {
    config: AppConfig,
}

impl LiveServices {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ServiceProvider for LiveServices {
    fn catalog(&self, base_url: &str) -> Result<Box<dyn CatalogService>, ErasureError> {
        // Re-read on every invocation so a rotated token needs no restart.
        let path = &self.config.catalog.user_token_path;
        let user_token = read_user_token(path)?;
        debug!(path = ?path, "Loaded catalog user token");

        let client = CatalogClient::from_settings(
            base_url,
            &user_token,
            &self.config.catalog,
            &self.config.http,
        )?;
        Ok(Box::new(client))
    }

    fn tokenizer(&self, params: &ActionParams) -> Result<Box<dyn Tokenizer>, ErasureError> {
        let tokenizer = CtsTokenizer::from_settings(
            &self.config.tokenization,
            &self.config.http,
            &params.cts_username,
            &params.cts_password,
        )?;
        Ok(Box::new(tokenizer))
    }

    fn connectors(&self) -> Result<Box<dyn ConnectorFactory>, ErasureError> {
        Ok(Box::new(CredentialResolver::new(
            &self.config.catalog.encryption_key,
            self.config.sqlserver.clone(),
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_catalog_requires_user_token_file() {
        let mut config = AppConfig::default();
        config.catalog.user_token_path = "/nonexistent/bigid_user_token.txt".into();
        let services = LiveServices::new(config);

        assert!(services.catalog("https://catalog/api/v1/").is_err());
    }

    #[tokio::test]
    async fn test_live_services_build() -> Result<()> {
        let dir = tempdir()?;
        let token_path = dir.path().join("token.txt");
        fs::write(&token_path, "abc\ndef\n")?;

        let mut config = AppConfig::default();
        config.catalog.user_token_path = token_path;
        config.catalog.encryption_key = "passphrase".into();
        config.tokenization.hostname = "cts.local".into();
        config.tokenization.certificate = dir.path().join("missing.pem");
        let services = LiveServices::new(config);

        services.catalog("https://catalog/api/v1")?;
        services.connectors()?;
        Ok(())
    }
}
