use chrono::{Duration, Utc};
use event_harvester::config::{Config, EventSourceConfig, IngestSettings, SourceKind};
use event_harvester::constants::{PLACEHOLDER_LOCATION_SENTINEL, PLACEHOLDER_VENUES};
use event_harvester::geocode::NullGeocoder;
use event_harvester::normalize::{DisabledSampler, RandomSampler};
use event_harvester::pipeline;
use event_harvester::store::InMemoryStore;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_fixture(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn source(key: &str, kind: SourceKind, url: String) -> EventSourceConfig {
    EventSourceConfig {
        key: key.to_string(),
        kind,
        url,
        enabled: true,
        tags: Vec::new(),
        default_duration_minutes: None,
        default_status: None,
        default_organizer_id: None,
        default_organizer_name: Some("Listings Desk".to_string()),
        default_venue_id: None,
        default_venue_name: Some("Town Hall".to_string()),
    }
}

fn config_for(sources: Vec<EventSourceConfig>) -> Config {
    Config {
        settings: IngestSettings::default(),
        sources,
    }
}

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.seed_organizer("Listings Desk");
    store.seed_venue("Town Hall");
    store
}

fn ics_calendar(events: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n{}END:VCALENDAR\r\n",
        events
    )
}

fn ics_event(uid: &str, summary: &str, start: &str, extra: &str) -> String {
    format!(
        "BEGIN:VEVENT\r\nUID:{uid}\r\nSUMMARY:{summary}\r\nDTSTART:{start}\r\n{extra}END:VEVENT\r\n"
    )
}

fn stamp(offset_days: i64) -> String {
    (Utc::now() + Duration::days(offset_days))
        .format("%Y%m%dT%H%M%SZ")
        .to_string()
}

#[tokio::test]
async fn duplicate_vevents_collapse_within_one_batch() {
    let start = stamp(2);
    let calendar = ics_calendar(&format!(
        "{}{}",
        ics_event("a-1", "Jazz Night", &start, ""),
        ics_event("a-2", "  jazz night ", &start, "")
    ));
    let file = write_fixture(&calendar);
    let config = config_for(vec![source(
        "campus-ics",
        SourceKind::Ics,
        file.path().to_string_lossy().to_string(),
    )]);
    let store = seeded_store();

    let outcome = pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.deduped, 1);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.inserted_events()[0].title, "Jazz Night");
}

#[tokio::test]
async fn events_already_stored_are_dropped() {
    let start_at = Utc::now() + Duration::days(5);
    let start = start_at.format("%Y%m%dT%H%M%SZ").to_string();
    let calendar = ics_calendar(&ics_event("b-1", "Farmers Market", &start, ""));
    let file = write_fixture(&calendar);
    let config = config_for(vec![source(
        "market-ics",
        SourceKind::Ics,
        file.path().to_string_lossy().to_string(),
    )]);

    let store = seeded_store();
    store.seed_event("Farmers Market", start_at);

    let outcome = pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fetched, 1);
    assert_eq!(outcome.deduped, 1);
    assert_eq!(outcome.inserted, 0);
}

#[tokio::test]
async fn redacted_location_is_substituted_from_the_placeholder_pool() {
    let start = stamp(1);
    let calendar = ics_calendar(&ics_event(
        "c-1",
        "Members Mixer",
        &start,
        &format!("LOCATION:{}\r\n", PLACEHOLDER_LOCATION_SENTINEL),
    ));
    let file = write_fixture(&calendar);
    let mut ics = source(
        "members-ics",
        SourceKind::Ics,
        file.path().to_string_lossy().to_string(),
    );
    ics.default_venue_name = None;
    let config = Config {
        settings: IngestSettings {
            demo_fallbacks: true,
            ..IngestSettings::default()
        },
        sources: vec![ics],
    };

    let store = InMemoryStore::new();
    store.seed_organizer("Listings Desk");
    let sampler = Arc::new(RandomSampler::seeded(11));

    pipeline::prepare_ingestion_run("test", &config, &store, Arc::new(NullGeocoder), sampler)
        .await
        .unwrap();

    let inserted = store.inserted_events();
    assert_eq!(inserted.len(), 1);
    // The sentinel resolved to a placeholder venue, which maps to a real id.
    let venue_id = inserted[0].venue_id.unwrap();
    let names = store.venue_names();
    assert_eq!(names.len(), PLACEHOLDER_VENUES.len());
    assert!(venue_id >= 1);
}

#[tokio::test]
async fn json_feed_defaults_to_ninety_minute_duration() {
    let start_at = Utc::now() + Duration::days(3);
    let feed = format!(
        r#"[{{"id": "d-1", "title": "Pop-up Market", "start_at": "{}"}}]"#,
        start_at.to_rfc3339()
    );
    let file = write_fixture(&feed);
    let config = config_for(vec![source(
        "city-json",
        SourceKind::Json,
        file.path().to_string_lossy().to_string(),
    )]);
    let store = seeded_store();

    pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    let inserted = store.inserted_events();
    assert_eq!(inserted.len(), 1);
    assert_eq!(
        inserted[0].end_at - inserted[0].start_at,
        Duration::minutes(90)
    );
}

#[tokio::test]
async fn unresolved_events_skip_without_failing_the_run() {
    let start_at = Utc::now() + Duration::days(3);
    let feed = format!(
        r#"[
            {{"id": "e-1", "title": "Resolvable", "start_at": "{0}", "venue": "Town Hall", "organizer": "Listings Desk"}},
            {{"id": "e-2", "title": "Orphan", "start_at": "{0}", "venue": "Nowhere Special", "organizer": "Nobody"}}
        ]"#,
        start_at.to_rfc3339()
    );
    let file = write_fixture(&feed);
    let mut json = source(
        "mixed-json",
        SourceKind::Json,
        file.path().to_string_lossy().to_string(),
    );
    // No config defaults to fall back on: the orphan's unknown names have
    // nothing left to resolve against and the event gets skipped.
    json.default_venue_name = None;
    json.default_organizer_name = None;
    let config = config_for(vec![json]);
    let store = seeded_store();

    let outcome = pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.inserted_events()[0].title, "Resolvable");
}

#[tokio::test]
async fn broken_source_does_not_block_healthy_sources() {
    let start_at = Utc::now() + Duration::days(3);
    let good = format!(
        r#"[{{"id": "f-1", "title": "Healthy Feed Event", "start_at": "{}"}}]"#,
        start_at.to_rfc3339()
    );
    let good_file = write_fixture(&good);
    let bad_file = write_fixture("this is not json");

    let config = config_for(vec![
        source(
            "bad-json",
            SourceKind::Json,
            bad_file.path().to_string_lossy().to_string(),
        ),
        source(
            "good-json",
            SourceKind::Json,
            good_file.path().to_string_lossy().to_string(),
        ),
    ]);
    let store = seeded_store();

    let outcome = pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fetched, 1);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.inserted_events()[0].title, "Healthy Feed Event");
}

#[tokio::test]
async fn category_rows_fan_out_per_inserted_event() {
    let start_at = Utc::now() + Duration::days(4);
    let feed = format!(
        r#"[{{"id": "g-1", "title": "Street Fair", "start_at": "{}", "categories": ["Food", "Music", "food"]}}]"#,
        start_at.to_rfc3339()
    );
    let file = write_fixture(&feed);
    let config = config_for(vec![source(
        "fair-json",
        SourceKind::Json,
        file.path().to_string_lossy().to_string(),
    )]);
    let store = seeded_store();

    let outcome = pipeline::prepare_ingestion_run(
        "test",
        &config,
        &store,
        Arc::new(NullGeocoder),
        Arc::new(DisabledSampler),
    )
    .await
    .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.category_rows, 2);
    let rows = store.category_rows();
    let mut categories: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    categories.sort_unstable();
    assert_eq!(categories, vec!["food", "music"]);
}
