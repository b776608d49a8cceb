// erasure-core/src/application/engine.rs

use std::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::domain::sql::UpdateStatement;
use crate::error::ErasureError;
use crate::ports::connector::RelationalConnector;

/// Runs a parameterized update through the port with timing.
#[instrument(skip(connector, statement), fields(dialect = %connector.dialect(), rows = statement.rows.len()))]
pub async fn execute_update(
    connector: &mut dyn RelationalConnector,
    statement: &UpdateStatement,
) -> Result<(), ErasureError> {
    let start = Instant::now();
    debug!("⚡ Executing update: {}", statement.sql);

    let result = connector.run_update(statement).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            debug!("✅ Update committed in {:.2?}", duration);
            Ok(())
        }
        Err(e) => {
            error!("❌ Update failed after {:.2?}: {}", duration, e);
            Err(e)
        }
    }
}

/// Releases a connector. A failing close is logged, never raised, so it cannot
/// mask the error that triggered it.
pub async fn close_quietly(connector: &mut dyn RelationalConnector) {
    if let Err(e) = connector.close().await {
        warn!(dialect = %connector.dialect(), error = %e, "Failed to close connector");
    }
}
