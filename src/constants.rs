//! Fixed pools and defaults shared across the pipeline.

/// Default lookback window (days) for duplicate detection against the store.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Default interval between ingestion cycles.
pub const DEFAULT_POLL_MINUTES: u64 = 15;

/// Fallback event duration when a feed omits or garbles the end time.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// RSS items carry no end time at all; assume a longer default.
pub const DEFAULT_RSS_DURATION_MINUTES: i64 = 120;

/// JSON feed records missing `end_at` default to a 90 minute slot.
pub const DEFAULT_JSON_DURATION_MINUTES: i64 = 90;

/// Location string emitted by feeds that redact the venue behind a login
/// wall. Compared case-insensitively; must never reach the store.
pub const PLACEHOLDER_LOCATION_SENTINEL: &str = "Private location (sign in to display)";

/// Seed categories for demo deployments where a feed carries no tags at all.
pub const CATEGORY_POOL: &[&str] = &[
    "music",
    "arts",
    "tech",
    "networking",
    "workshop",
    "sports",
    "food",
    "community",
];

/// Synthetic venue used when a feed gives us nothing to resolve against.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderVenue {
    pub name: &'static str,
    pub street_address: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub postal_code: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// Last-resort venue pool. These double as the substitution targets for the
/// redacted-location sentinel, so substituted events resolve to real rows.
pub const PLACEHOLDER_VENUES: &[PlaceholderVenue] = &[
    PlaceholderVenue {
        name: "Desert Innovation Hub",
        street_address: "401 S Palm Dr",
        city: "Tempe",
        state: "AZ",
        postal_code: "85281",
        lat: 33.4193,
        lon: -111.9345,
    },
    PlaceholderVenue {
        name: "Sunset Collaboration Center",
        street_address: "18 W University Blvd",
        city: "Phoenix",
        state: "AZ",
        postal_code: "85004",
        lat: 33.4514,
        lon: -112.0738,
    },
    PlaceholderVenue {
        name: "Mesa Civic Pavilion",
        street_address: "245 N Center St",
        city: "Mesa",
        state: "AZ",
        postal_code: "85201",
        lat: 33.4222,
        lon: -111.8226,
    },
    PlaceholderVenue {
        name: "Canyon Learning Loft",
        street_address: "777 W Grand Ave",
        city: "Phoenix",
        state: "AZ",
        postal_code: "85007",
        lat: 33.4529,
        lon: -112.0887,
    },
    PlaceholderVenue {
        name: "Copper State Commons",
        street_address: "1225 S Mill Ave",
        city: "Tempe",
        state: "AZ",
        postal_code: "85281",
        lat: 33.4102,
        lon: -111.9402,
    },
    PlaceholderVenue {
        name: "Camelback Cultural Hall",
        street_address: "950 E Camelback Rd",
        city: "Phoenix",
        state: "AZ",
        postal_code: "85014",
        lat: 33.5093,
        lon: -112.0618,
    },
    PlaceholderVenue {
        name: "Arcadia Arts Annex",
        street_address: "3101 N 48th St",
        city: "Phoenix",
        state: "AZ",
        postal_code: "85018",
        lat: 33.483,
        lon: -111.9826,
    },
    PlaceholderVenue {
        name: "Papago Tech Works",
        street_address: "690 N Scottsdale Rd",
        city: "Scottsdale",
        state: "AZ",
        postal_code: "85257",
        lat: 33.4543,
        lon: -111.9258,
    },
    PlaceholderVenue {
        name: "Rio Salado Studio",
        street_address: "625 E Rio Salado Pkwy",
        city: "Tempe",
        state: "AZ",
        postal_code: "85281",
        lat: 33.4308,
        lon: -111.9307,
    },
    PlaceholderVenue {
        name: "Downtown Discovery Lab",
        street_address: "55 W Jackson St",
        city: "Phoenix",
        state: "AZ",
        postal_code: "85003",
        lat: 33.4465,
        lon: -112.0742,
    },
];

/// Synthetic organizer used when neither the feed nor the source config
/// resolves to a real row.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderOrganizer {
    pub org_name: &'static str,
    pub website_url: Option<&'static str>,
}

pub const PLACEHOLDER_ORGANIZERS: &[PlaceholderOrganizer] = &[
    PlaceholderOrganizer {
        org_name: "Valley Events Collective",
        website_url: Some("https://valleyeventscollective.example.org"),
    },
    PlaceholderOrganizer {
        org_name: "Cactus Community Network",
        website_url: Some("https://cactuscommunity.example.org"),
    },
    PlaceholderOrganizer {
        org_name: "Salt River Social Club",
        website_url: None,
    },
    PlaceholderOrganizer {
        org_name: "Grand Avenue Arts Council",
        website_url: Some("https://grandavearts.example.org"),
    },
    PlaceholderOrganizer {
        org_name: "Sonoran Makers Guild",
        website_url: None,
    },
    PlaceholderOrganizer {
        org_name: "Maricopa Meetup Circle",
        website_url: None,
    },
];
