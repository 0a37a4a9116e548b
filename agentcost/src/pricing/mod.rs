//! Dynamic model pricing: the process-wide quote snapshot, the baseline
//! catalog sync, and pure cost arithmetic.
//!
//! # Snapshot semantics
//!
//! The hot path (event ingestion) never queries the database for prices. A
//! [`PricingSnapshot`] - every quote of every model, time-ordered - lives
//! behind an [`arc_swap::ArcSwap`]. Request handlers `load_full()` it once
//! and resolve all events of a batch against that one consistent view; every
//! pricing write rebuilds the snapshot from the database and swaps it in
//! wholesale. Readers therefore observe either the old or the new quote set,
//! never a half-applied update.
//!
//! # Resolution
//!
//! `resolve(model, at)` returns the quote effective at `at`: the unique one
//! with `valid_from <= at < valid_until` (open quotes have no upper bound).
//! An unknown model or a timestamp before the first quote resolves to
//! `None` - never to a silent zero price.

pub mod catalog;
pub mod cost;

use crate::db::handlers::PriceQuotes;
use crate::db::models::pricing::{PriceQuote, QuoteCreateDBRequest, QuoteOrigin};
use crate::errors::Result;
use arc_swap::ArcSwap;
use catalog::CatalogEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// All quotes of one model, time-ordered, plus its downgrade hint.
#[derive(Debug, Clone, Default)]
pub struct ModelQuotes {
    /// Sorted by `valid_from` ascending
    pub quotes: Vec<PriceQuote>,
    pub downgrade_to: Option<String>,
}

/// Immutable, consistent view of the whole pricing table.
#[derive(Debug, Default)]
pub struct PricingSnapshot {
    models: HashMap<String, ModelQuotes>,
}

impl PricingSnapshot {
    pub(crate) fn build(quotes: Vec<PriceQuote>, hints: &HashMap<String, String>) -> Self {
        let mut models: HashMap<String, ModelQuotes> = HashMap::new();
        for quote in quotes {
            models.entry(quote.model_name.clone()).or_default().quotes.push(quote);
        }
        for (model, entry) in models.iter_mut() {
            entry.quotes.sort_by_key(|q| q.valid_from);
            entry.downgrade_to = hints.get(model).cloned();
        }
        Self { models }
    }

    /// Resolve the quote effective for `model` at `at`, if any.
    pub fn resolve(&self, model: &str, at: DateTime<Utc>) -> Option<&PriceQuote> {
        self.models.get(model)?.quotes.iter().rev().find(|q| {
            q.valid_from <= at && q.valid_until.map(|until| at < until).unwrap_or(true)
        })
    }

    /// The cheaper model suggested as a downgrade target for `model`, if the
    /// catalog names one.
    pub fn downgrade_candidate(&self, model: &str) -> Option<&str> {
        self.models.get(model)?.downgrade_to.as_deref()
    }

    /// Number of models with at least one quote
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

/// Process-wide pricing table cache. Shared via `Arc` in [`crate::AppState`].
pub struct PricingTable {
    cache: ArcSwap<PricingSnapshot>,
}

impl PricingTable {
    /// Create an empty table; call [`reload`](Self::reload) to populate it.
    pub fn empty() -> Self {
        Self {
            cache: ArcSwap::from_pointee(PricingSnapshot::default()),
        }
    }

    /// A consistent snapshot for the duration of one request.
    pub fn snapshot(&self) -> Arc<PricingSnapshot> {
        self.cache.load_full()
    }

    /// Rebuild the snapshot from the database and swap it in. Called after
    /// every pricing write (manual quote insert, catalog sync).
    #[instrument(skip_all, err)]
    pub async fn reload(&self, pool: &SqlitePool) -> Result<()> {
        let mut conn = pool.acquire().await?;
        let quotes = PriceQuotes::new(&mut conn).list_all().await?;

        let hints: HashMap<String, String> = catalog::builtin()
            .iter()
            .filter_map(|e| e.downgrade_to.clone().map(|d| (e.model_name.clone(), d)))
            .collect();

        let snapshot = PricingSnapshot::build(quotes, &hints);
        info!(models = snapshot.model_count(), "pricing snapshot reloaded");
        self.cache.store(Arc::new(snapshot));
        Ok(())
    }
}

/// Result of a catalog sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub models_created: usize,
    pub models_updated: usize,
    pub overrides_preserved: usize,
    pub unchanged: usize,
}

/// Seed or update `default`-origin quotes from a catalog.
///
/// Policy: quotes whose open entry has `origin = 'override'` are never
/// touched - operator decisions survive every sync. A changed default price
/// closes the open quote at `now` and opens a replacement, preserving the
/// historical record for event-time pricing. First-time models are seeded
/// from the UNIX epoch so that backfilled historical events still price.
///
/// The whole sync is one transaction: it applies fully or not at all.
#[instrument(skip_all, fields(entries = entries.len()), err)]
pub async fn sync_defaults(pool: &SqlitePool, entries: &[CatalogEntry]) -> Result<SyncReport> {
    let now = Utc::now();
    let mut report = SyncReport::default();

    let mut tx = pool.begin().await?;
    let mut repo = PriceQuotes::new(&mut tx);

    for entry in entries {
        let open = repo.open_quote(&entry.model_name).await?;
        match open {
            None => {
                repo.insert(&QuoteCreateDBRequest {
                    model_name: entry.model_name.clone(),
                    provider: entry.provider.clone(),
                    input_price_per_token: entry.input_price_per_token,
                    output_price_per_token: entry.output_price_per_token,
                    currency: "USD".to_string(),
                    origin: QuoteOrigin::Default,
                    valid_from: DateTime::UNIX_EPOCH,
                })
                .await?;
                report.models_created += 1;
            }
            Some(open) if open.origin == QuoteOrigin::Override => {
                report.overrides_preserved += 1;
            }
            Some(open)
                if open.input_price_per_token == entry.input_price_per_token
                    && open.output_price_per_token == entry.output_price_per_token =>
            {
                report.unchanged += 1;
            }
            Some(open) => {
                repo.close(open.id, now).await?;
                repo.insert(&QuoteCreateDBRequest {
                    model_name: entry.model_name.clone(),
                    provider: entry.provider.clone(),
                    input_price_per_token: entry.input_price_per_token,
                    output_price_per_token: entry.output_price_per_token,
                    currency: "USD".to_string(),
                    origin: QuoteOrigin::Default,
                    valid_from: now,
                })
                .await?;
                report.models_updated += 1;
            }
        }
    }

    tx.commit().await?;

    info!(
        created = report.models_created,
        updated = report.models_updated,
        overrides = report.overrides_preserved,
        "pricing catalog synced"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn quote(model: &str, input: &str, from_secs: i64, until_secs: Option<i64>) -> PriceQuote {
        PriceQuote {
            id: Uuid::new_v4(),
            model_name: model.to_string(),
            provider: None,
            input_price_per_token: Decimal::from_str(input).unwrap(),
            output_price_per_token: Decimal::from_str(input).unwrap(),
            currency: "USD".to_string(),
            origin: QuoteOrigin::Default,
            valid_from: DateTime::from_timestamp(from_secs, 0).unwrap(),
            valid_until: until_secs.map(|s| DateTime::from_timestamp(s, 0).unwrap()),
            created_at: Utc::now(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn resolves_the_quote_covering_the_timestamp() {
        let snapshot = PricingSnapshot::build(
            vec![
                quote("m", "0.001", 0, Some(100)),
                quote("m", "0.002", 100, None),
            ],
            &HashMap::new(),
        );

        assert_eq!(
            snapshot.resolve("m", at(50)).unwrap().input_price_per_token,
            Decimal::from_str("0.001").unwrap()
        );
        // valid_until is exclusive, valid_from inclusive
        assert_eq!(
            snapshot.resolve("m", at(100)).unwrap().input_price_per_token,
            Decimal::from_str("0.002").unwrap()
        );
        assert_eq!(
            snapshot.resolve("m", at(5000)).unwrap().input_price_per_token,
            Decimal::from_str("0.002").unwrap()
        );
    }

    #[test]
    fn unknown_model_and_pre_history_timestamps_resolve_to_none() {
        let snapshot = PricingSnapshot::build(vec![quote("m", "0.001", 100, None)], &HashMap::new());

        assert!(snapshot.resolve("other", at(200)).is_none());
        assert!(snapshot.resolve("m", at(50)).is_none());
    }

    #[test]
    fn downgrade_hints_come_from_the_catalog() {
        let hints: HashMap<String, String> = [("m".to_string(), "m-mini".to_string())].into();
        let snapshot = PricingSnapshot::build(vec![quote("m", "0.001", 0, None)], &hints);

        assert_eq!(snapshot.downgrade_candidate("m"), Some("m-mini"));
        assert_eq!(snapshot.downgrade_candidate("m-mini"), None);
    }
}
