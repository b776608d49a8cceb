// erasure-core/src/infrastructure/tokenization.rs
//
// Client for the vendor tokenization REST API (`/vts/rest/v2.0/tokenize`).

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, instrument, warn};

use crate::error::ErasureError;
use crate::infrastructure::config::{HttpSettings, TokenizationSettings};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::http::{RetryPolicy, build_client, send_with_retry};
use crate::ports::tokenizer::{TokenSpec, Tokenizer};

/// Vendor error reason for values too short to tokenize under the template's keepleft.
pub const KEEPLEFT_REASON_PREFIX: &str = "After accounting for keepleft";

#[derive(Debug, Serialize)]
struct TokenizeDirective<'a> {
    tokengroup: &'a str,
    data: &'a str,
    tokentemplate: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResult {
    status: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub struct CtsTokenizer {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryPolicy,
}

impl CtsTokenizer {
    /// `base_url` ends with `/`; the `tokenize` method name is appended to it.
    pub fn new(base_url: &str, username: &str, password: &str, client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            retry,
        }
    }

    /// HTTPS client for `https://{hostname}/vts/rest/v2.0/`. The configured PEM is trusted
    /// when the file exists; otherwise certificate validation is disabled.
    pub fn from_settings(
        settings: &TokenizationSettings,
        http: &HttpSettings,
        username: &str,
        password: &str,
    ) -> Result<Self, InfrastructureError> {
        let certificate = if settings.certificate.exists() {
            let pem = fs::read(&settings.certificate)?;
            Some(Certificate::from_pem(&pem)?)
        } else {
            warn!(
                path = ?settings.certificate,
                "Tokenization certificate not found, TLS verification disabled"
            );
            None
        };
        let accept_invalid = certificate.is_none();
        let client = build_client(http, certificate, accept_invalid)?;

        Ok(Self::new(
            &format!("https://{}/vts/rest/v2.0/", settings.hostname),
            username,
            password,
            client,
            RetryPolicy::from_settings(http),
        ))
    }

    async fn request(&self, body: &[TokenizeDirective<'_>]) -> Result<Vec<TokenizeResult>, InfrastructureError> {
        let url = format!("{}tokenize", self.base_url);
        let request = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body);
        let response = send_with_retry(request, &self.retry).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InfrastructureError::Tokenization(format!(
                "request failed with status code {}: {}",
                status.as_u16(),
                text
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tokenizer for CtsTokenizer {
    #[instrument(skip(self, values), fields(count = values.len(), group = %spec.group))]
    async fn tokenize(&self, values: &[String], spec: &TokenSpec) -> Result<Vec<String>, ErasureError> {
        let mut tokens = values.to_vec();

        // Empty strings have nothing to tokenize and are never sent.
        let pending: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_empty())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Ok(tokens);
        }

        let body: Vec<TokenizeDirective> = pending
            .iter()
            .map(|&i| TokenizeDirective {
                tokengroup: &spec.group,
                data: &values[i],
                tokentemplate: &spec.template,
            })
            .collect();
        let results = self.request(&body).await?;

        if results.len() != pending.len() {
            return Err(InfrastructureError::Tokenization(format!(
                "expected {} results, received {}",
                pending.len(),
                results.len()
            ))
            .into());
        }

        for (&index, result) in pending.iter().zip(results) {
            if result.status == "error" {
                let reason = result.reason.unwrap_or_default();
                if reason.starts_with(KEEPLEFT_REASON_PREFIX) {
                    warn!(reason = %reason, "Value too short to tokenize, keeping original");
                    continue;
                }
                return Err(InfrastructureError::Tokenization(reason).into());
            }
            tokens[index] = result.token.ok_or_else(|| {
                InfrastructureError::Tokenization(format!(
                    "status '{}' without a token",
                    result.status
                ))
            })?;
        }

        debug!(tokenized = pending.len(), "Tokenization batch done");
        Ok(tokens)
    }
}
