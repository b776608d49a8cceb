// erasure-core/src/domain/action.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::domain::categories::read_categories;
use crate::domain::error::DomainError;

// --- TRIGGER (what the catalog sends to /api/execute) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParam {
    pub param_name: String,
    /// Usually a string, but the catalog may send numbers for numeric parameters.
    #[serde(default)]
    pub param_value: serde_json::Value,
}

impl ActionParam {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            param_name: name.to_string(),
            param_value: serde_json::Value::String(value.to_string()),
        }
    }

    fn value_as_string(&self) -> String {
        match &self.param_value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub action_name: String,
    #[serde(default)]
    pub tpa_id: String,
    #[serde(default)]
    pub bigid_base_url: String,
    #[serde(default)]
    pub action_params: Vec<ActionParam>,
}

// --- ACTIONS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Anonymize,
    Remediate,
}

impl FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Anonymize" => Ok(Self::Anonymize),
            "Remediate" => Ok(Self::Remediate),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

// --- PARAMETERS ---

pub const PARAM_CTS_USERNAME: &str = "CTSUsername";
pub const PARAM_CTS_PASSWORD: &str = "CTSPassword";
pub const PARAM_CATEGORIES: &str = "Categories";
pub const PARAM_TOKEN_GROUP: &str = "CTSTokengroup";
pub const PARAM_TOKEN_TEMPLATE: &str = "CTSTokentemplate";
pub const PARAM_BATCH_SIZE: &str = "BatchSize";

/// Validated action parameters. `categories` empty means every category is allowed.
#[derive(Clone, Validate)]
pub struct ActionParams {
    #[validate(length(min = 1, message = "CTSUsername cannot be empty"))]
    pub cts_username: String,
    pub cts_password: String,
    pub categories: BTreeSet<String>,
    #[validate(length(min = 1, message = "CTSTokengroup cannot be empty"))]
    pub token_group: String,
    #[validate(length(min = 1, message = "CTSTokentemplate cannot be empty"))]
    pub token_template: String,
    #[validate(range(min = 1, message = "BatchSize must be a positive integer"))]
    pub batch_size: Option<i64>,
}

impl ActionParams {
    pub fn from_params(params: &[ActionParam]) -> Result<Self, DomainError> {
        let lookup = |name: &str| {
            params
                .iter()
                .find(|p| p.param_name == name)
                .map(ActionParam::value_as_string)
        };
        let require =
            |name: &str| lookup(name).ok_or_else(|| DomainError::MissingParameter(name.to_string()));

        let batch_size = match lookup(PARAM_BATCH_SIZE) {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                DomainError::Configuration(format!(
                    "BatchSize must be a positive integer, got '{}'",
                    raw
                ))
            })?),
        };

        let parsed = Self {
            cts_username: require(PARAM_CTS_USERNAME)?,
            cts_password: require(PARAM_CTS_PASSWORD)?,
            categories: read_categories(&lookup(PARAM_CATEGORIES).unwrap_or_default()),
            token_group: require(PARAM_TOKEN_GROUP)?,
            token_template: require(PARAM_TOKEN_TEMPLATE)?,
            batch_size,
        };

        parsed
            .validate()
            .map_err(|e| DomainError::Configuration(e.to_string()))?;
        Ok(parsed)
    }

    /// The remediation batch size; required only by `Remediate`.
    pub fn require_batch_size(&self) -> Result<usize, DomainError> {
        let size = self
            .batch_size
            .ok_or_else(|| DomainError::MissingParameter(PARAM_BATCH_SIZE.to_string()))?;
        usize::try_from(size).map_err(|_| {
            DomainError::Configuration(format!("BatchSize must be a positive integer, got {}", size))
        })
    }
}

// Keeps the vendor password out of logs.
impl fmt::Debug for ActionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionParams")
            .field("cts_username", &self.cts_username)
            .field("cts_password", &"***")
            .field("categories", &self.categories)
            .field("token_group", &self.token_group)
            .field("token_template", &self.token_template)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

// --- RESULT ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub execution_id: Option<String>,
    pub status_enum: ActionStatus,
    pub progress: f64,
    pub message: String,
}

impl ActionResponse {
    pub fn completed(execution_id: Option<String>, action_name: &str) -> Self {
        Self {
            execution_id,
            status_enum: ActionStatus::Completed,
            progress: 1.0,
            message: format!("Completed action {} successfully", action_name),
        }
    }

    pub fn failed(execution_id: Option<String>, action_name: &str, detail: impl fmt::Display) -> Self {
        Self {
            execution_id,
            status_enum: ActionStatus::Error,
            progress: 0.5,
            message: format!(
                "Error - attempt to execute action {} failed: {}",
                action_name, detail
            ),
        }
    }

    pub fn rejected(execution_id: Option<String>, error: &DomainError) -> Self {
        Self {
            execution_id,
            status_enum: ActionStatus::Error,
            progress: 0.5,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn base_params() -> Vec<ActionParam> {
        vec![
            ActionParam::new("CTSUsername", "cts-user"),
            ActionParam::new("CTSPassword", "s3cret"),
            ActionParam::new("Categories", "Email, Phone ,Email"),
            ActionParam::new("CTSTokengroup", "tg"),
            ActionParam::new("CTSTokentemplate", "alphanum"),
        ]
    }

    #[test]
    fn test_parse_params() -> Result<()> {
        let params = ActionParams::from_params(&base_params())?;
        assert_eq!(params.cts_username, "cts-user");
        assert_eq!(params.token_template, "alphanum");
        assert_eq!(params.categories.len(), 2);
        assert_eq!(params.batch_size, None);
        Ok(())
    }

    #[test]
    fn test_missing_parameter() {
        let params: Vec<_> = base_params()
            .into_iter()
            .filter(|p| p.param_name != "CTSTokengroup")
            .collect();
        let err = ActionParams::from_params(&params).unwrap_err();
        assert!(matches!(err, DomainError::MissingParameter(ref n) if n == "CTSTokengroup"));
    }

    #[test]
    fn test_missing_categories_allows_all() -> Result<()> {
        let params: Vec<_> = base_params()
            .into_iter()
            .filter(|p| p.param_name != "Categories")
            .collect();
        assert!(ActionParams::from_params(&params)?.categories.is_empty());
        Ok(())
    }

    #[test]
    fn test_batch_size_numeric_json_value() -> Result<()> {
        let mut params = base_params();
        params.push(ActionParam {
            param_name: "BatchSize".into(),
            param_value: serde_json::json!(500),
        });
        let parsed = ActionParams::from_params(&params)?;
        assert_eq!(parsed.require_batch_size()?, 500);
        Ok(())
    }

    #[test]
    fn test_non_positive_batch_size_is_configuration_error() {
        for raw in ["0", "-3", "ten"] {
            let mut params = base_params();
            params.push(ActionParam::new("BatchSize", raw));
            let err = ActionParams::from_params(&params).unwrap_err();
            assert!(matches!(err, DomainError::Configuration(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_batch_size_required_for_remediation() -> Result<()> {
        let params = ActionParams::from_params(&base_params())?;
        assert!(matches!(
            params.require_batch_size(),
            Err(DomainError::MissingParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_password_not_in_debug() -> Result<()> {
        let params = ActionParams::from_params(&base_params())?;
        assert!(!format!("{:?}", params).contains("s3cret"));
        Ok(())
    }

    #[test]
    fn test_action_kind() {
        assert_eq!("Anonymize".parse::<ActionKind>().unwrap(), ActionKind::Anonymize);
        assert_eq!("Remediate".parse::<ActionKind>().unwrap(), ActionKind::Remediate);
        let err = "Explode".parse::<ActionKind>().unwrap_err();
        assert_eq!(err.to_string(), "No such action: Explode");
    }

    #[test]
    fn test_request_and_response_wire_shape() -> Result<()> {
        let body = r#"{
            "executionId": "exec-1",
            "actionName": "Anonymize",
            "tpaId": "tpa-9",
            "bigidBaseUrl": "https://bigid.local/api/v1/",
            "actionParams": [{"paramName": "CTSUsername", "paramValue": "u"}]
        }"#;
        let req: ActionRequest = serde_json::from_str(body)?;
        assert_eq!(req.execution_id.as_deref(), Some("exec-1"));
        assert_eq!(req.action_params.len(), 1);

        let resp = ActionResponse::completed(req.execution_id, &req.action_name);
        let json = serde_json::to_value(&resp)?;
        assert_eq!(json["statusEnum"], "COMPLETED");
        assert_eq!(json["progress"], 1.0);
        assert_eq!(json["message"], "Completed action Anonymize successfully");
        assert_eq!(json["executionId"], "exec-1");
        Ok(())
    }
}
