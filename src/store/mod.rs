//! Relational-store boundary for the pipeline.

pub mod supabase;

pub use supabase::SupabaseStore;

use crate::domain::{
    EventCategoryRow, InsertEventPayload, NewOrganizerRow, NewVenueRow, RefRow, StoredEventRow,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::debug;

/// Store operations the pipeline depends on. Bulk inserts that return rows
/// must preserve input order; the category fan-out relies on positional
/// correspondence between payloads and generated ids.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Title/start pairs for stored events starting at or after `since`.
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<StoredEventRow>>;

    async fn organizers(&self) -> Result<Vec<RefRow>>;
    async fn venues(&self) -> Result<Vec<RefRow>>;

    /// Inserts event rows, returning generated ids in input order.
    async fn insert_events(&self, payloads: &[InsertEventPayload]) -> Result<Vec<i64>>;
    async fn insert_event_categories(&self, rows: &[EventCategoryRow]) -> Result<()>;

    /// Inserts venue rows, returning (id, name) in input order.
    async fn insert_venues(&self, rows: &[NewVenueRow]) -> Result<Vec<RefRow>>;
    /// Inserts organizer rows, returning (id, name) in input order.
    async fn insert_organizers(&self, rows: &[NewOrganizerRow]) -> Result<Vec<RefRow>>;
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: i64,
    events: Vec<StoredEventRow>,
    inserted_events: Vec<(i64, InsertEventPayload)>,
    event_categories: Vec<EventCategoryRow>,
    organizers: Vec<RefRow>,
    venues: Vec<RefRow>,
    venue_insert_batches: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored event so dedup has something to compare against.
    pub fn seed_event(&self, title: &str, start_at: DateTime<Utc>) {
        let mut state = self.inner.lock().unwrap();
        state.events.push(StoredEventRow {
            title: title.to_string(),
            start_at,
        });
    }

    pub fn seed_organizer(&self, name: &str) -> i64 {
        let mut state = self.inner.lock().unwrap();
        let id = state.allocate_id();
        state.organizers.push(RefRow {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn seed_venue(&self, name: &str) -> i64 {
        let mut state = self.inner.lock().unwrap();
        let id = state.allocate_id();
        state.venues.push(RefRow {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn inserted_events(&self) -> Vec<InsertEventPayload> {
        let state = self.inner.lock().unwrap();
        state
            .inserted_events
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn category_rows(&self) -> Vec<EventCategoryRow> {
        self.inner.lock().unwrap().event_categories.clone()
    }

    pub fn venue_names(&self) -> Vec<String> {
        let state = self.inner.lock().unwrap();
        state.venues.iter().map(|row| row.name.clone()).collect()
    }

    /// Number of bulk venue-insert calls made against this store.
    pub fn venue_insert_batches(&self) -> usize {
        self.inner.lock().unwrap().venue_insert_batches
    }
}

impl InMemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<StoredEventRow>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|row| row.start_at >= since)
            .cloned()
            .collect())
    }

    async fn organizers(&self) -> Result<Vec<RefRow>> {
        Ok(self.inner.lock().unwrap().organizers.clone())
    }

    async fn venues(&self) -> Result<Vec<RefRow>> {
        Ok(self.inner.lock().unwrap().venues.clone())
    }

    async fn insert_events(&self, payloads: &[InsertEventPayload]) -> Result<Vec<i64>> {
        let mut state = self.inner.lock().unwrap();
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let id = state.allocate_id();
            state.events.push(StoredEventRow {
                title: payload.title.clone(),
                start_at: payload.start_at,
            });
            state.inserted_events.push((id, payload.clone()));
            ids.push(id);
        }
        debug!("Inserted {} event(s) into in-memory store", ids.len());
        Ok(ids)
    }

    async fn insert_event_categories(&self, rows: &[EventCategoryRow]) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.event_categories.extend(rows.iter().cloned());
        Ok(())
    }

    async fn insert_venues(&self, rows: &[NewVenueRow]) -> Result<Vec<RefRow>> {
        let mut state = self.inner.lock().unwrap();
        state.venue_insert_batches += 1;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let id = state.allocate_id();
            let reference = RefRow {
                id,
                name: row.name.clone(),
            };
            state.venues.push(reference.clone());
            inserted.push(reference);
        }
        Ok(inserted)
    }

    async fn insert_organizers(&self, rows: &[NewOrganizerRow]) -> Result<Vec<RefRow>> {
        let mut state = self.inner.lock().unwrap();
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let id = state.allocate_id();
            let reference = RefRow {
                id,
                name: row.org_name.clone(),
            };
            state.organizers.push(reference.clone());
            inserted.push(reference);
        }
        Ok(inserted)
    }
}
