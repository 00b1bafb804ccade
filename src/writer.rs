//! Persistence writer: bulk event insert followed by category fan-out.

use crate::domain::{EventCategoryRow, InsertEventPayload, PendingInsert};
use crate::error::{IngestError, Result};
use crate::store::EventStore;
use std::collections::BTreeSet;
use tracing::info;

/// What the writer persisted in one call.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsertResult {
    pub events: usize,
    pub category_rows: usize,
}

/// Inserts the pending events in one bulk call, then fans each event's
/// categories out against the returned ids. Ids are assumed to come back in
/// input order; a count mismatch aborts before any category row is written.
pub async fn insert_pending_events(
    store: &dyn EventStore,
    pending: &[PendingInsert],
) -> Result<InsertResult> {
    if pending.is_empty() {
        return Ok(InsertResult::default());
    }

    let payloads: Vec<InsertEventPayload> =
        pending.iter().map(|item| item.payload.clone()).collect();
    let ids = store.insert_events(&payloads).await?;
    if ids.len() != pending.len() {
        return Err(IngestError::Store {
            message: format!(
                "event insert returned {} id(s) for {} row(s)",
                ids.len(),
                pending.len()
            ),
        });
    }

    let mut category_rows = Vec::new();
    for (event_id, item) in ids.iter().zip(pending) {
        // BTreeSet guards against duplicate categories slipping through and
        // gives the fan-out a stable order.
        let unique: BTreeSet<&str> = item.categories.iter().map(String::as_str).collect();
        for category in unique {
            category_rows.push(EventCategoryRow {
                event_id: *event_id,
                category: category.to_string(),
            });
        }
    }

    if !category_rows.is_empty() {
        store.insert_event_categories(&category_rows).await?;
    }

    info!(
        "Persisted {} event(s) with {} category row(s)",
        ids.len(),
        category_rows.len()
    );
    Ok(InsertResult {
        events: ids.len(),
        category_rows: category_rows.len(),
    })
}
