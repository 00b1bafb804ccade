//! PostgREST-backed store (Supabase).
//!
//! Config via env:
//! - SUPABASE_URL (e.g., https://xyzcompany.supabase.co) OR SUPABASE_PROJECT_REF
//! - SUPABASE_SERVICE_ROLE_KEY (service role key)

use super::EventStore;
use crate::domain::{
    EventCategoryRow, InsertEventPayload, NewOrganizerRow, NewVenueRow, RefRow, StoredEventRow,
};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    /// Allow either a full URL or a project ref.
    pub fn from_env() -> Result<Self> {
        let base_url = match std::env::var("SUPABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let project_ref = std::env::var("SUPABASE_PROJECT_REF").map_err(|_| {
                    IngestError::Config(
                        "set SUPABASE_URL or SUPABASE_PROJECT_REF".to_string(),
                    )
                })?;
                format!("https://{}.supabase.co", project_ref)
            }
        };
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").map_err(|_| {
            IngestError::Config("SUPABASE_SERVICE_ROLE_KEY is required".to_string())
        })?;
        Ok(Self::new(base_url, service_key))
    }

    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn check(table: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IngestError::Store {
            message: format!("{} request failed: {} - {}", table, status, body),
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.endpoint(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(query)
            .send()
            .await?;
        let response = Self::check(table, response).await?;
        Ok(response.json().await?)
    }

    /// POST with `Prefer: return=representation` so generated ids come back
    /// in the same order as the submitted rows.
    async fn insert_returning<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        body: &B,
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .post(self.endpoint(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .query(&[("select", select)])
            .json(body)
            .send()
            .await?;
        let response = Self::check(table, response).await?;
        Ok(response.json().await?)
    }

    async fn insert_minimal<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct EventIdRow {
    event_id: i64,
}

#[derive(Deserialize)]
struct OrganizerRow {
    organizer_id: i64,
    org_name: String,
}

#[derive(Deserialize)]
struct VenueRow {
    venue_id: i64,
    name: String,
}

#[async_trait]
impl EventStore for SupabaseStore {
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<StoredEventRow>> {
        let filter = format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Secs, true));
        self.select(
            "event",
            &[
                ("select", "title,start_at".to_string()),
                ("start_at", filter),
            ],
        )
        .await
    }

    async fn organizers(&self) -> Result<Vec<RefRow>> {
        let rows: Vec<OrganizerRow> = self
            .select(
                "organizer",
                &[("select", "organizer_id,org_name".to_string())],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RefRow {
                id: row.organizer_id,
                name: row.org_name,
            })
            .collect())
    }

    async fn venues(&self) -> Result<Vec<RefRow>> {
        let rows: Vec<VenueRow> = self
            .select("venue", &[("select", "venue_id,name".to_string())])
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RefRow {
                id: row.venue_id,
                name: row.name,
            })
            .collect())
    }

    async fn insert_events(&self, payloads: &[InsertEventPayload]) -> Result<Vec<i64>> {
        let rows: Vec<EventIdRow> = self
            .insert_returning("event", "event_id", payloads)
            .await?;
        Ok(rows.into_iter().map(|row| row.event_id).collect())
    }

    async fn insert_event_categories(&self, rows: &[EventCategoryRow]) -> Result<()> {
        self.insert_minimal("event_category", rows).await
    }

    async fn insert_venues(&self, rows: &[NewVenueRow]) -> Result<Vec<RefRow>> {
        let inserted: Vec<VenueRow> = self
            .insert_returning("venue", "venue_id,name", rows)
            .await?;
        Ok(inserted
            .into_iter()
            .map(|row| RefRow {
                id: row.venue_id,
                name: row.name,
            })
            .collect())
    }

    async fn insert_organizers(&self, rows: &[NewOrganizerRow]) -> Result<Vec<RefRow>> {
        let inserted: Vec<OrganizerRow> = self
            .insert_returning("organizer", "organizer_id,org_name", rows)
            .await?;
        Ok(inserted
            .into_iter()
            .map(|row| RefRow {
                id: row.organizer_id,
                name: row.org_name,
            })
            .collect())
    }
}
