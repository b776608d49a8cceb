// erasure-core/src/infrastructure/credentials.rs
//
// Credential resolution: decrypts the catalog's credential blobs and turns a
// data source descriptor into a connected relational connector.

use aes::Aes256;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use block_modes::block_padding::NoPadding;
use block_modes::{BlockMode, Cbc};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::domain::datasource::{Credential, Credentials, DataSourceDescriptor, Dialect};
use crate::error::ErasureError;
use crate::infrastructure::adapters::{self, ConnectionParams};
use crate::infrastructure::config::SqlServerSettings;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::connector::{ConnectorFactory, RelationalConnector};

type Aes256Cbc = Cbc<Aes256, NoPadding>;

/// Decrypts `<base64 iv>$<base64 ciphertext>` with AES-256-CBC, key = SHA-256(passphrase).
/// Padding is removed by trimming as many bytes as the value of the last byte.
pub fn decrypt(payload: &str, passphrase: &str) -> Result<String, InfrastructureError> {
    let bad = |what: &str| InfrastructureError::Credential(format!("cannot decrypt credential: {}", what));

    let (iv_b64, ct_b64) = payload
        .split_once('$')
        .ok_or_else(|| bad("expected '<iv>$<ciphertext>'"))?;
    let iv = STANDARD.decode(iv_b64.trim()).map_err(|_| bad("iv is not base64"))?;
    let ciphertext = STANDARD
        .decode(ct_b64.trim())
        .map_err(|_| bad("ciphertext is not base64"))?;

    let key = Sha256::digest(passphrase.as_bytes());
    let cipher = Aes256Cbc::new_from_slices(&key, &iv).map_err(|_| bad("iv must be 16 bytes"))?;

    let mut buffer = ciphertext;
    let plain = cipher
        .decrypt(&mut buffer)
        .map_err(|_| bad("ciphertext length is not a multiple of the block size"))?;

    let pad = plain.last().copied().map(usize::from).unwrap_or(0);
    if pad == 0 || pad > plain.len() {
        return Err(bad("invalid padding (wrong encryption key?)"));
    }
    String::from_utf8(plain[..plain.len() - pad].to_vec())
        .map_err(|_| bad("plaintext is not UTF-8 (wrong encryption key?)"))
}

/// Plaintext value of a credential; unencrypted values pass through unchanged.
pub fn reveal(credential: &Credential, passphrase: &str) -> Result<String, InfrastructureError> {
    if credential.encrypted {
        decrypt(&credential.value, passphrase)
    } else {
        Ok(credential.value.clone())
    }
}

/// Network address parsed from a data source `host_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
    /// Oracle SID, from `host:port/SID`.
    pub sid: Option<String>,
}

impl HostAddress {
    pub fn parse(dialect: Dialect, host_url: &str) -> Result<Self, InfrastructureError> {
        let bad = || {
            let expected = match dialect {
                Dialect::Oracle => "host:port/SID",
                _ => "host:port",
            };
            InfrastructureError::Credential(format!(
                "{} host URL '{}' does not match {}",
                dialect, host_url, expected
            ))
        };

        let (host, rest) = host_url.trim().split_once(':').ok_or_else(bad)?;
        let (port, sid) = match dialect {
            Dialect::Oracle => {
                let (port, sid) = rest.split_once('/').ok_or_else(bad)?;
                if sid.is_empty() || sid.contains('/') {
                    return Err(bad());
                }
                (port, Some(sid.to_string()))
            }
            _ => (rest, None),
        };
        if host.is_empty() {
            return Err(bad());
        }
        let port = port.parse::<u16>().map_err(|_| bad())?;

        Ok(Self {
            host: host.to_string(),
            port,
            sid,
        })
    }
}

/// Builds connection parameters: address from the descriptor, plaintext credentials.
pub fn connection_params(
    descriptor: &DataSourceDescriptor,
    credentials: &Credentials,
    passphrase: &str,
) -> Result<ConnectionParams, InfrastructureError> {
    let address = HostAddress::parse(descriptor.dialect, &descriptor.host_url)?;
    Ok(ConnectionParams {
        database: address.sid.unwrap_or_else(|| descriptor.database.clone()),
        host: address.host,
        port: address.port,
        username: reveal(&credentials.username, passphrase)?,
        password: reveal(&credentials.password, passphrase)?,
    })
}

/// [`ConnectorFactory`] backed by the real drivers.
pub struct CredentialResolver {
    encryption_key: String,
    sqlserver: SqlServerSettings,
}

impl CredentialResolver {
    pub fn new(encryption_key: &str, sqlserver: SqlServerSettings) -> Self {
        Self {
            encryption_key: encryption_key.to_string(),
            sqlserver,
        }
    }
}

#[async_trait]
impl ConnectorFactory for CredentialResolver {
    #[instrument(skip(self, credentials), fields(source = %descriptor.name, dialect = %descriptor.dialect))]
    async fn open(
        &self,
        descriptor: &DataSourceDescriptor,
        credentials: &Credentials,
    ) -> Result<Box<dyn RelationalConnector>, ErasureError> {
        let params = connection_params(descriptor, credentials, &self.encryption_key)?;
        let mut connector = adapters::connector_for(descriptor.dialect, params, &self.sqlserver);
        connector.connect().await?;
        info!("Connected to data source");
        Ok(connector)
    }
}
