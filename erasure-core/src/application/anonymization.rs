// erasure-core/src/application/anonymization.rs

use tracing::{error, info, instrument, warn};

use crate::application::engine::{close_quietly, execute_update};
use crate::application::session::Session;
use crate::domain::categories::category_allowed;
use crate::domain::grouping::partition_by;
use crate::domain::record::{FieldRecord, ObjectName};
use crate::domain::sql::{ColumnUpdate, TableRef};
use crate::domain::unique_id::select_unique_id_record;
use crate::error::ErasureError;
use crate::ports::connector::RelationalConnector;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnonymizationReport {
    pub requests_completed: Vec<String>,
    pub statements_executed: usize,
    /// Proximity groups left untouched for lack of a unique identifier.
    pub groups_skipped: usize,
}

/// Anonymizes every pending minimization request.
///
/// The first data source failure aborts the run: the connector is released, the
/// error propagates, and the request being processed is not marked complete.
#[instrument(skip(session), fields(tpa = %session.tpa_id))]
pub async fn run_anonymization(session: &Session<'_>) -> Result<AnonymizationReport, ErasureError> {
    let mut report = AnonymizationReport::default();

    let requests = session.catalog.fetch_pending_minimization_requests().await?;
    if requests.is_empty() {
        info!("No deletion requests found, nothing to anonymize");
        return Ok(report);
    }
    info!(categories = ?session.params.categories, "Categories that will be anonymized");

    for request in &requests {
        info!(request_id = %request.request_id, "Processing minimization request");

        let selected: Vec<FieldRecord> = session
            .catalog
            .fetch_records(&request.request_id)
            .await?
            .into_iter()
            .filter(|r| request.is_selected(r))
            .collect();

        for (source_name, records) in partition_by(selected, |r| r.source_name.clone()) {
            info!(source = %source_name, records = records.len(), "Anonymizing data source");
            let mut connector = session.open_source(&source_name).await?;

            let outcome = anonymize_source(session, connector.as_mut(), records, &mut report).await;
            close_quietly(connector.as_mut()).await;

            if let Err(e) = outcome {
                error!(source = %source_name, error = %e, "Anonymization failed");
                return Err(e);
            }
        }

        session
            .catalog
            .mark_minimization_complete(&request.request_id, &request.secondary_ids)
            .await?;
        report.requests_completed.push(request.request_id.clone());
    }

    Ok(report)
}

async fn anonymize_source(
    session: &Session<'_>,
    connector: &mut dyn RelationalConnector,
    records: Vec<FieldRecord>,
    report: &mut AnonymizationReport,
) -> Result<(), ErasureError> {
    for (proximity_id, group) in partition_by(records, |r| r.proximity_id.clone()) {
        let Some(unique_id) = select_unique_id_record(&group).cloned() else {
            warn!(
                proximity_id = %proximity_id,
                "No unique identifier or primary key, skipping to avoid updating the wrong rows"
            );
            report.groups_skipped += 1;
            continue;
        };
        info!(proximity_id = %proximity_id, unique_id = %unique_id.original_column_name, "Anonymizing row");

        let allowed = &session.params.categories;
        let siblings: Vec<&FieldRecord> = group
            .iter()
            .filter(|r| {
                r.original_column_name != unique_id.original_column_name
                    && !r.value.is_empty()
                    && category_allowed(&r.category, allowed)
                    && !r.is_primary_key
            })
            .collect();

        if !siblings.is_empty() {
            let values: Vec<String> = siblings.iter().map(|r| r.value.clone()).collect();
            let tokens = session.tokenizer.tokenize(&values, &session.token_spec).await?;
            if tokens.len() != values.len() {
                return Err(ErasureError::InternalError(format!(
                    "expected {} tokens, got {}",
                    values.len(),
                    tokens.len()
                )));
            }
            report.statements_executed +=
                update_siblings(session, connector, &siblings, &tokens, &unique_id).await?;
        }

        // The identifier anchors every sibling update, so it goes last.
        if category_allowed(&unique_id.category, allowed) && !unique_id.value.is_empty() {
            let token = session
                .tokenizer
                .tokenize_value(Some(unique_id.value.as_str()), &session.token_spec)
                .await?
                .unwrap_or_default();
            let table = table_of(&unique_id)?;
            let update = ColumnUpdate {
                column: unique_id.original_column_name.clone(),
                original: unique_id.value.clone(),
                token,
            };
            let statement = connector.build_update_statement(
                &table,
                &[update],
                &unique_id.original_column_name,
                &unique_id.value,
            )?;
            execute_update(connector, &statement).await?;
            report.statements_executed += 1;
            info!(column = %unique_id.original_column_name, "Unique identifier anonymized");
        }
    }
    Ok(())
}

/// One statement per sibling, or one multi-column statement per table when
/// `combine_row_updates` is set. Every statement is anchored on the unique identifier.
async fn update_siblings(
    session: &Session<'_>,
    connector: &mut dyn RelationalConnector,
    siblings: &[&FieldRecord],
    tokens: &[String],
    unique_id: &FieldRecord,
) -> Result<usize, ErasureError> {
    let updates: Vec<(&FieldRecord, ColumnUpdate)> = siblings
        .iter()
        .zip(tokens)
        .map(|(record, token)| {
            (
                *record,
                ColumnUpdate {
                    column: record.original_column_name.clone(),
                    original: record.value.clone(),
                    token: token.clone(),
                },
            )
        })
        .collect();

    let batches: Vec<(String, Vec<ColumnUpdate>)> = if session.anonymization.combine_row_updates {
        partition_by(updates, |(r, _)| r.full_object_name.clone())
            .into_iter()
            .map(|(object, items)| (object, items.into_iter().map(|(_, u)| u).collect()))
            .collect()
    } else {
        updates
            .into_iter()
            .map(|(r, u)| (r.full_object_name.clone(), vec![u]))
            .collect()
    };

    let mut executed = 0;
    for (object, columns) in batches {
        let table = TableRef::from(&ObjectName::parse(&object)?);
        let statement = connector.build_update_statement(
            &table,
            &columns,
            &unique_id.original_column_name,
            &unique_id.value,
        )?;
        execute_update(connector, &statement).await?;
        executed += 1;
    }
    Ok(executed)
}

fn table_of(record: &FieldRecord) -> Result<TableRef, ErasureError> {
    Ok(TableRef::from(&record.object_name()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::testing::{MockCatalog, MockDb, MockFactory, MockTokenizer, field, params};
    use crate::domain::record::MinimizationRequest;
    use crate::infrastructure::config::AppConfig;
    use anyhow::Result;
    use std::collections::{BTreeSet, HashMap};

    const CUSTOMERS: &str = "db.schema.customers";

    fn request(id: &str, objects: &[&str]) -> MinimizationRequest {
        MinimizationRequest {
            request_id: id.to_string(),
            selected_object_names: objects.iter().map(|o| o.to_string()).collect(),
            secondary_ids: vec![format!("{}-obj", id)],
        }
    }

    fn unique_id(source: &str, value: &str, category: &str, proximity: &str) -> FieldRecord {
        let mut record = field(source, CUSTOMERS, "id", value, category, proximity);
        record.is_identity_unique_id = true;
        record
    }

    fn catalog_with(records: Vec<FieldRecord>) -> MockCatalog {
        MockCatalog {
            requests: vec![request("R1", &[CUSTOMERS])],
            records: HashMap::from([("R1".to_string(), records)]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_email_anonymized_anchored_on_unique_id() -> Result<()> {
        let catalog = catalog_with(vec![
            field("db", CUSTOMERS, "email", "email-value", "Email", "42"),
            unique_id("db", "7", "Identifier", "42"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        let report = run_anonymization(&session).await?;

        assert_eq!(tokenizer.calls(), vec![vec!["email-value".to_string()]]);
        let updates = factory.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].sql,
            "UPDATE `schema`.`customers` SET `email` = ? WHERE `email` = ? AND `id` = ?"
        );
        assert_eq!(updates[0].rows, vec![vec!["tk_email-value", "email-value", "7"]]);
        assert!(!updates[0].sql.contains("SET `id`"));
        assert_eq!(catalog.writes(), vec!["complete:R1:R1-obj"]);
        assert_eq!(report.requests_completed, vec!["R1"]);
        assert_eq!(factory.closes(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_id_updated_last_when_allowed() -> Result<()> {
        let catalog = catalog_with(vec![
            unique_id("db", "jane@corp.com", "Email", "1"),
            field("db", CUSTOMERS, "phone", "555-0100", "Phone", "1"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        run_anonymization(&session).await?;

        let updates = factory.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].sql.contains("SET `phone` = ?"));
        assert_eq!(updates[0].rows[0][2], "jane@corp.com");
        assert!(updates[1].sql.contains("SET `id` = ?"));
        assert_eq!(
            updates[1].rows,
            vec![vec!["tk_jane@corp.com", "jane@corp.com", "jane@corp.com"]]
        );
        assert_eq!(tokenizer.calls().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_group_without_key_is_never_updated() -> Result<()> {
        let catalog = catalog_with(vec![
            field("db", CUSTOMERS, "email", "a@b.c", "Email", "9"),
            field("db", CUSTOMERS, "phone", "555", "Phone", "9"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        let report = run_anonymization(&session).await?;

        assert!(factory.updates().is_empty());
        assert!(tokenizer.calls().is_empty());
        assert_eq!(report.groups_skipped, 1);
        assert_eq!(report.requests_completed, vec!["R1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_primary_keys_empty_values_and_categories() -> Result<()> {
        let mut pk = field("db", CUSTOMERS, "legacy_id", "99", "Email", "5");
        pk.is_primary_key = true;
        let catalog = catalog_with(vec![
            unique_id("db", "5", "Identifier", "5"),
            pk,
            field("db", CUSTOMERS, "email", "", "Email", "5"),
            field("db", CUSTOMERS, "notes", "free text", "Notes", "5"),
            field("db", CUSTOMERS, "phone", "555", "Phone", "5"),
            field("db", "db.schema.other", "email", "x@y.z", "Email", "5"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        run_anonymization(&session).await?;

        // `db.schema.other` is not selected by the request.
        assert_eq!(tokenizer.calls(), vec![vec!["555".to_string()]]);
        assert_eq!(factory.updates().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsorted_records_are_grouped_by_source_and_row() -> Result<()> {
        let catalog = catalog_with(vec![
            field("db", CUSTOMERS, "email", "a@x", "Email", "1"),
            field("crm", CUSTOMERS, "email", "c@x", "Email", "3"),
            unique_id("db", "2", "Identifier", "2"),
            unique_id("db", "1", "Identifier", "1"),
            field("db", CUSTOMERS, "email", "b@x", "Email", "2"),
            unique_id("crm", "3", "Identifier", "3"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        run_anonymization(&session).await?;

        // One connection per source, whatever the record order.
        assert_eq!(factory.opened(), vec!["crm", "db"]);
        let anchors: BTreeSet<String> = factory
            .updates()
            .iter()
            .map(|u| format!("{}={}", u.rows[0][1], u.rows[0][2]))
            .collect();
        assert_eq!(
            anchors,
            BTreeSet::from(["a@x=1".to_string(), "b@x=2".to_string(), "c@x=3".to_string()])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_combined_row_update() -> Result<()> {
        let catalog = catalog_with(vec![
            unique_id("db", "7", "Identifier", "42"),
            field("db", CUSTOMERS, "email", "e", "Email", "42"),
            field("db", CUSTOMERS, "phone", "p", "Phone", "42"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let mut config = AppConfig::default();
        config.anonymization.combine_row_updates = true;
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        run_anonymization(&session).await?;

        let updates = factory.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].sql,
            "UPDATE `schema`.`customers` SET `email` = ?, `phone` = ? WHERE `email` = ? AND `phone` = ? AND `id` = ?"
        );
        assert_eq!(updates[0].rows, vec![vec!["tk_e", "tk_p", "e", "p", "7"]]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_closes_connector_and_skips_completion() {
        let catalog = catalog_with(vec![
            field("db", CUSTOMERS, "email", "e", "Email", "42"),
            unique_id("db", "7", "Identifier", "42"),
        ]);
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::with_db(MockDb {
            fail_updates: true,
            ..Default::default()
        });
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        let result = run_anonymization(&session).await;

        assert!(result.is_err());
        assert_eq!(factory.closes(), 1);
        assert!(catalog.writes().is_empty());
    }

    #[tokio::test]
    async fn test_no_pending_requests() -> Result<()> {
        let catalog = MockCatalog::default();
        let tokenizer = MockTokenizer::default();
        let factory = MockFactory::default();
        let config = AppConfig::default();
        let session = Session::new(&catalog, &tokenizer, &factory, "tpa", params(None), &config);

        let report = run_anonymization(&session).await?;
        assert_eq!(report, AnonymizationReport::default());
        assert!(factory.opened().is_empty());
        Ok(())
    }
}
