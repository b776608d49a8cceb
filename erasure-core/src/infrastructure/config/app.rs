// erasure-core/src/infrastructure/config/app.rs

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::error::InfrastructureError;

pub const DEFAULT_CONFIG_FILE: &str = "erasure.yaml";

// --- CONFIGURATION STRUCTS ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[validate(nested)]
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[validate(nested)]
    #[serde(default)]
    pub tokenization: TokenizationSettings,

    #[validate(nested)]
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub anonymization: AnonymizationSettings,

    #[validate(nested)]
    #[serde(default)]
    pub remediation: RemediationSettings,

    #[serde(default)]
    pub sqlserver: SqlServerSettings,

    #[validate(nested)]
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CatalogSettings {
    /// File holding the long-lived user token, possibly wrapped over several lines.
    #[serde(default = "default_user_token_path")]
    pub user_token_path: PathBuf,

    /// Passphrase whose SHA-256 digest decrypts data source credentials.
    #[validate(length(min = 1, message = "catalog.encryption_key cannot be empty"))]
    #[serde(default)]
    pub encryption_key: String,

    #[validate(range(min = 1, message = "access_token_ttl_hours must be at least 1"))]
    #[serde(default = "default_ttl_hours")]
    pub access_token_ttl_hours: u64,

    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            user_token_path: default_user_token_path(),
            encryption_key: String::new(),
            access_token_ttl_hours: default_ttl_hours(),
            accept_invalid_certs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenizationSettings {
    #[validate(length(min = 1, message = "tokenization.hostname cannot be empty"))]
    #[serde(default)]
    pub hostname: String,

    /// PEM trusted as a root certificate when the file exists.
    #[serde(default = "default_certificate")]
    pub certificate: PathBuf,
}

impl Default for TokenizationSettings {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            certificate: default_certificate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpSettings {
    #[validate(range(min = 1, message = "http.timeout_secs must be at least 1"))]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnonymizationSettings {
    /// Update all sibling fields of a row with one multi-column statement.
    #[serde(default)]
    pub combine_row_updates: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemediationSettings {
    #[validate(length(min = 1, message = "remediation.action_sentinel cannot be empty"))]
    #[serde(default = "default_sentinel")]
    pub action_sentinel: String,

    #[serde(default = "default_true")]
    pub comment_columns: bool,

    #[serde(default)]
    pub tag_columns: bool,

    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    #[serde(default = "default_tag_description")]
    pub tag_description: String,
}

impl Default for RemediationSettings {
    fn default() -> Self {
        Self {
            action_sentinel: default_sentinel(),
            comment_columns: true,
            tag_columns: false,
            tag_name: default_tag_name(),
            tag_description: default_tag_description(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlServerSettings {
    #[serde(default = "default_true")]
    pub trust_server_certificate: bool,
}

impl Default for SqlServerSettings {
    fn default() -> Self {
        Self {
            trust_server_certificate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            manifest_path: default_manifest_path(),
            assets_dir: default_assets_dir(),
            log_path: default_log_path(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_user_token_path() -> PathBuf {
    PathBuf::from("bigid_user_token.txt")
}
fn default_ttl_hours() -> u64 {
    23
}
fn default_certificate() -> PathBuf {
    PathBuf::from("cts.pem")
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    200
}
fn default_sentinel() -> String {
    "Thales Tokenization".to_string()
}
fn default_tag_name() -> String {
    "Thales Tokenized".to_string()
}
fn default_tag_description() -> String {
    "Column tokenized by Thales CipherTrust".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_manifest_path() -> PathBuf {
    PathBuf::from("Manifest")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("log.txt")
}

// --- LOADER ---

#[instrument]
pub fn load_app_config(path: &Path) -> Result<AppConfig, InfrastructureError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(path.display().to_string()));
    }
    info!(path = ?path, "Loading configuration");

    let mut config: AppConfig = load_fragment(path)?;

    // Layering: the environment wins over the file.
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;
    Ok(config)
}

fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("ERASURE_ENCRYPTION_KEY") {
        info!("Overriding encryption key via ENV");
        config.catalog.encryption_key = val;
    }
    if let Some(val) = lookup("ERASURE_USER_TOKEN_PATH") {
        info!(old = ?config.catalog.user_token_path, new = ?val, "Overriding user token path via ENV");
        config.catalog.user_token_path = PathBuf::from(val);
    }
    if let Some(val) = lookup("ERASURE_TOKENIZATION_HOST") {
        info!(old = ?config.tokenization.hostname, new = ?val, "Overriding tokenization host via ENV");
        config.tokenization.hostname = val;
    }
    if let Some(val) = lookup("ERASURE_LOG_PATH") {
        info!(old = ?config.server.log_path, new = ?val, "Overriding log path via ENV");
        config.server.log_path = PathBuf::from(val);
    }
}

/// Reads the catalog user token: every line stripped, then concatenated.
pub fn read_user_token(path: &Path) -> Result<String, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::trim).collect())
}
