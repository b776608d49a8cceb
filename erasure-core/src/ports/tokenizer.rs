// erasure-core/src/ports/tokenizer.rs

use async_trait::async_trait;

use crate::error::ErasureError;

/// Vendor token group and template applied to every value of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    pub group: String,
    pub template: String,
}

impl TokenSpec {
    pub fn new(group: &str, template: &str) -> Self {
        Self {
            group: group.to_string(),
            template: template.to_string(),
        }
    }
}

#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Returns one token per value, in order. An empty slice makes no call;
    /// empty strings come back unchanged.
    async fn tokenize(&self, values: &[String], spec: &TokenSpec) -> Result<Vec<String>, ErasureError>;

    /// Scalar form: `None` and `""` are returned as-is without a vendor call.
    async fn tokenize_value(
        &self,
        value: Option<&str>,
        spec: &TokenSpec,
    ) -> Result<Option<String>, ErasureError> {
        match value {
            None => Ok(None),
            Some("") => Ok(Some(String::new())),
            Some(v) => {
                let tokens = self.tokenize(&[v.to_string()], spec).await?;
                tokens.into_iter().next().map(Some).ok_or_else(|| {
                    ErasureError::InternalError("tokenizer returned no token for one value".into())
                })
            }
        }
    }
}
