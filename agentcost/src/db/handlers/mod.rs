//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed operations, and returns domain models from
//! [`crate::db::models`]. Mutating flows hand a transaction to the
//! repository so that multi-step updates (close a quote + open its
//! replacement, insert a whole batch) commit atomically.
//!
//! - [`Projects`]: Tenant management and API-key resolution
//! - [`PriceQuotes`]: Time-versioned per-model pricing
//! - [`Events`]: Append-only usage event log with idempotent inserts
//! - [`analytics`]: The single aggregation query shape behind every report

pub mod analytics;
pub mod events;
pub mod pricing;
pub mod projects;
pub mod repository;

pub use events::Events;
pub use pricing::PriceQuotes;
pub use projects::Projects;
pub use repository::Repository;
