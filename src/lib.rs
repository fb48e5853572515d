pub mod aggregate;
pub mod api;
pub mod config;
pub mod dates;
pub mod db;
pub mod deadlines;
pub mod documents;
pub mod models;
pub mod report;
pub mod store;

pub use api::{build_router, AppState};
pub use config::Settings;
pub use dates::{normalize_deadline_date, DeadlineClock};
pub use deadlines::build_digest;
pub use models::{
    DeadlineDigest, DeadlineFilter, DeadlineRecord, NormalizedDeadline, StandaloneDeadline,
};
pub use store::{IngestSummary, MemoryStore, UniversityStore};
