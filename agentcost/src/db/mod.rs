//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx over SQLite.
//! It follows the Repository pattern to provide clean abstractions over
//! database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries & mutations)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories work with SQLx transactions to ensure ACID properties.
//! Mutating flows create repositories from a transaction; read-only flows may
//! use a pooled connection directly:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Events::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! # SQLite specifics
//!
//! SQLite has no native decimal type, so monetary values are stored in two
//! fixed representations: per-token prices as decimal TEXT, per-event costs
//! as INTEGER nano-USD (see [`crate::pricing::cost`]). Aggregation over costs
//! is therefore exact integer arithmetic pushed down to the storage engine.

pub mod errors;
pub mod handlers;
pub mod models;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Open (creating if missing) the SQLite database at `path` and return a
/// connection pool with WAL journaling and foreign keys enabled.
pub async fn connect(path: &Path, max_connections: u32) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!(path = %path.display(), "database pool initialized");
    Ok(pool)
}
