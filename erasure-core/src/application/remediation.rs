// erasure-core/src/application/remediation.rs

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::application::engine::{close_quietly, execute_update};
use crate::application::session::Session;
use crate::domain::comments::{tokenized_columns, tokenized_comment};
use crate::domain::datasource::{DataSourceDescriptor, Dialect};
use crate::domain::pagination::offsets_and_fetch_sizes;
use crate::domain::record::RemediationObject;
use crate::domain::sql::TableRef;
use crate::error::ErasureError;
use crate::ports::connector::RelationalConnector;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    /// `fully_qualified_name.column` for every column tokenized in this run.
    pub columns_tokenized: Vec<String>,
    pub rows_tokenized: u64,
    pub failed_sources: Vec<String>,
}

/// Tokenizes, in place, every policy-hit column whose object was flagged with the
/// tokenization action.
///
/// A failing data source is logged and skipped; the run still ends in an error
/// naming every source that failed.
#[instrument(skip(session), fields(tpa = %session.tpa_id))]
pub async fn run_remediation(session: &Session<'_>) -> Result<RemediationReport, ErasureError> {
    let batch_size = session.params.require_batch_size()? as u64;
    let mut report = RemediationReport::default();

    let sources = session
        .catalog
        .fetch_reachable_data_sources(&Dialect::ALL)
        .await?;
    info!(count = sources.len(), "Data sources eligible for remediation");

    for source in &sources {
        if let Err(e) = remediate_source(session, source, batch_size, &mut report).await {
            error!(source = %source.name, error = %e, "Remediation failed for data source");
            report.failed_sources.push(source.name.clone());
        }
    }

    if !report.failed_sources.is_empty() {
        return Err(ErasureError::InternalError(format!(
            "remediation failed for data sources: {}",
            report.failed_sources.join(", ")
        )));
    }
    Ok(report)
}

async fn remediate_source(
    session: &Session<'_>,
    source: &DataSourceDescriptor,
    batch_size: u64,
    report: &mut RemediationReport,
) -> Result<(), ErasureError> {
    let sentinel = &session.remediation.action_sentinel;
    let objects: Vec<RemediationObject> = session
        .catalog
        .fetch_remediation_objects(&source.name)
        .await?
        .into_iter()
        .filter(|o| o.is_tokenization_requested(sentinel))
        .collect();

    if objects.is_empty() {
        info!(source = %source.name, "No objects flagged for tokenization");
        return Ok(());
    }

    let mut connector = session.open(source).await?;
    let mut outcome = Ok(());
    for object in &objects {
        outcome = remediate_object(session, connector.as_mut(), object, batch_size, report).await;
        if outcome.is_err() {
            break;
        }
    }
    close_quietly(connector.as_mut()).await;
    outcome
}

async fn remediate_object(
    session: &Session<'_>,
    connector: &mut dyn RelationalConnector,
    object: &RemediationObject,
    batch_size: u64,
    report: &mut RemediationReport,
) -> Result<(), ErasureError> {
    let comments = session
        .catalog
        .fetch_object_comments(&object.annotation_id)
        .await?;
    let already_tokenized = tokenized_columns(comments.iter().map(String::as_str));

    let table = TableRef::from(&object.object_name()?);
    let primary_keys = connector.primary_keys(&table).await?;
    if primary_keys.is_empty() {
        warn!(object = %object.fully_qualified_name, "Table has no primary key, skipping");
        return Ok(());
    }

    for column in &object.policy_hit_columns {
        if already_tokenized.contains(column) {
            info!(object = %object.fully_qualified_name, column = %column, "Column already tokenized");
            continue;
        }
        let Some(primary_key) = primary_keys.iter().find(|pk| !pk.eq_ignore_ascii_case(column)) else {
            warn!(
                object = %object.fully_qualified_name,
                column = %column,
                "Column is the only primary key, skipping"
            );
            continue;
        };

        let rows = tokenize_column(session, connector, &table, primary_key, column, batch_size).await?;
        report.rows_tokenized += rows;
        report
            .columns_tokenized
            .push(format!("{}.{}", object.fully_qualified_name, column));
        info!(object = %object.fully_qualified_name, column = %column, rows, "🔐 Column tokenized");

        record_tokenization(session, object, column).await;
    }
    Ok(())
}

/// Walks the whole table in key order, one page at a time, and returns the number of rows rewritten.
async fn tokenize_column(
    session: &Session<'_>,
    connector: &mut dyn RelationalConnector,
    table: &TableRef,
    primary_key: &str,
    column: &str,
    batch_size: u64,
) -> Result<u64, ErasureError> {
    let row_count = connector.count_rows(table).await?;
    let mut rewritten = 0;

    for page in offsets_and_fetch_sizes(row_count, batch_size) {
        let batch = connector.fetch_batch(table, primary_key, column, page).await?;
        let (keys, values): (Vec<String>, Vec<String>) = batch
            .into_iter()
            .filter_map(|(pk, value)| value.filter(|v| !v.is_empty()).map(|v| (pk, v)))
            .unzip();
        if values.is_empty() {
            continue;
        }

        let tokens = session.tokenizer.tokenize(&values, &session.token_spec).await?;
        if tokens.len() != keys.len() {
            return Err(ErasureError::InternalError(format!(
                "expected {} tokens, got {}",
                keys.len(),
                tokens.len()
            )));
        }

        let pairs: Vec<(String, String)> = tokens.into_iter().zip(keys).collect();
        rewritten += pairs.len() as u64;
        let statement = connector.build_bulk_update(table, column, primary_key, pairs);
        execute_update(connector, &statement).await?;
    }
    Ok(rewritten)
}

/// Comments and tags are informational; failures are logged and never abort the run.
async fn record_tokenization(session: &Session<'_>, object: &RemediationObject, column: &str) {
    let settings = &session.remediation;

    if settings.comment_columns {
        let comment = tokenized_comment(column, Utc::now());
        if let Err(e) = session.catalog.post_comment(&object.annotation_id, &comment).await {
            warn!(object = %object.fully_qualified_name, error = %e, "Failed to post tokenization comment");
        }
    }

    if settings.tag_columns {
        let tagged = async {
            session
                .catalog
                .create_tag(&settings.tag_name, &settings.tag_description)
                .await?;
            session.catalog.add_tag(object, column, &settings.tag_name).await
        };
        if let Err(e) = tagged.await {
            warn!(object = %object.fully_qualified_name, error = %e, "Failed to tag tokenized column");
        }
    }
}
