//! Event harvester: pulls event listings from ICS, RSS, and JSON feeds,
//! normalizes them into one shape, drops duplicates against recent storage,
//! resolves organizers and venues to ids, and bulk-writes the result.

pub mod config;
pub mod constants;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod runner;
pub mod sources;
pub mod store;
pub mod writer;

pub use error::{IngestError, Result};
