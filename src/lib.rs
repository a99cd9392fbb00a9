// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod hero;
pub mod ingest;
pub mod metrics;
pub mod registry;
pub mod service;

// ---- Re-exports for stable public API ----
// `newsdesk::api::router` and `newsdesk::router`
pub use crate::api::{router, AppState};
pub use crate::ingest::types::{Article, FeedTransport, SourceStatus};
pub use crate::registry::{Category, CategoryFilter, FeedSource, SourceRegistry};
pub use crate::service::FeedService;
