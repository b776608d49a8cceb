// erasure-core/src/application/action.rs

use tracing::{error, info, instrument, warn};

use crate::application::anonymization::run_anonymization;
use crate::application::remediation::run_remediation;
use crate::application::session::Session;
use crate::domain::action::{ActionKind, ActionParams, ActionRequest, ActionResponse};
use crate::error::ErasureError;
use crate::infrastructure::config::AppConfig;
use crate::ports::catalog::CatalogService;
use crate::ports::connector::ConnectorFactory;
use crate::ports::tokenizer::Tokenizer;

/// Builds the collaborators of one invocation.
/// The catalog base URL and the vendor credentials arrive with each trigger.
pub trait ServiceProvider: Send + Sync {
    fn catalog(&self, base_url: &str) -> Result<Box<dyn CatalogService>, ErasureError>;

    fn tokenizer(&self, params: &ActionParams) -> Result<Box<dyn Tokenizer>, ErasureError>;

    fn connectors(&self) -> Result<Box<dyn ConnectorFactory>, ErasureError>;
}

/// Runs one trigger to completion. Never fails: every error is logged and folded
/// into an `ERROR` response.
#[instrument(skip_all, fields(action = %request.action_name, tpa = %request.tpa_id))]
pub async fn execute_action(
    request: &ActionRequest,
    provider: &dyn ServiceProvider,
    config: &AppConfig,
) -> ActionResponse {
    let execution_id = request.execution_id.clone();

    let kind: ActionKind = match request.action_name.parse() {
        Ok(kind) => kind,
        Err(e) => {
            warn!(error = %e, "Rejected action");
            return ActionResponse::rejected(execution_id, &e);
        }
    };

    info!("🚀 Executing action {}", request.action_name);
    match run(kind, request, provider, config).await {
        Ok(()) => {
            info!("✅ Action {} completed", request.action_name);
            ActionResponse::completed(execution_id, &request.action_name)
        }
        Err(e) => {
            error!("❌ Action {} failed: {:?}", request.action_name, e);
            ActionResponse::failed(execution_id, &request.action_name, e)
        }
    }
}

async fn run(
    kind: ActionKind,
    request: &ActionRequest,
    provider: &dyn ServiceProvider,
    config: &AppConfig,
) -> Result<(), ErasureError> {
    let params = ActionParams::from_params(&request.action_params)?;
    let catalog = provider.catalog(&request.bigid_base_url)?;
    let tokenizer = provider.tokenizer(&params)?;
    let connectors = provider.connectors()?;

    let session = Session::new(
        catalog.as_ref(),
        tokenizer.as_ref(),
        connectors.as_ref(),
        &request.tpa_id,
        params,
        config,
    );

    match kind {
        ActionKind::Anonymize => {
            let report = run_anonymization(&session).await?;
            info!(
                requests = report.requests_completed.len(),
                statements = report.statements_executed,
                skipped_groups = report.groups_skipped,
                "Anonymization finished"
            );
        }
        ActionKind::Remediate => {
            let report = run_remediation(&session).await?;
            info!(
                columns = report.columns_tokenized.len(),
                rows = report.rows_tokenized,
                "Remediation finished"
            );
        }
    }
    Ok(())
}
