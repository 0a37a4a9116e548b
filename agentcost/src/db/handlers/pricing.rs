//! Database repository for model price quotes.
//!
//! Quotes for one model form a non-overlapping, time-ordered sequence:
//! closed quotes cover disjoint `[valid_from, valid_until)` ranges and at
//! most one open quote (`valid_until IS NULL`) exists per model, enforced by
//! a partial unique index. Inserting a replacement always happens inside the
//! caller's transaction: close the open quote at the new `valid_from`, then
//! insert.

use crate::{
    db::{
        errors::Result,
        models::pricing::{PriceQuote, PriceQuoteRow, QuoteCreateDBRequest},
    },
    types::PriceQuoteId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

const QUOTE_COLUMNS: &str = "id, model_name, provider, input_price_per_token, output_price_per_token, currency, origin, valid_from, valid_until, created_at";

pub struct PriceQuotes<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> PriceQuotes<'c> {
    /// Create a new PriceQuotes repository instance
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Insert a new quote row. Callers are responsible for closing the
    /// previous open quote first; the partial unique index rejects a second
    /// open quote for the same model.
    #[instrument(skip(self, request), fields(model = %request.model_name, origin = %request.origin), err)]
    pub async fn insert(&mut self, request: &QuoteCreateDBRequest) -> Result<PriceQuote> {
        let id: PriceQuoteId = Uuid::new_v4();

        let row = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            r#"
            INSERT INTO price_quotes (id, model_name, provider, input_price_per_token,
                                      output_price_per_token, currency, origin, valid_from,
                                      valid_until, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)
            RETURNING {QUOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.model_name)
        .bind(&request.provider)
        .bind(request.input_price_per_token.to_string())
        .bind(request.output_price_per_token.to_string())
        .bind(&request.currency)
        .bind(request.origin.as_str())
        .bind(request.valid_from)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(row.try_into()?)
    }

    /// Get the currently open quote for a model, if any
    #[instrument(skip(self), err)]
    pub async fn open_quote(&mut self, model_name: &str) -> Result<Option<PriceQuote>> {
        let row = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM price_quotes WHERE model_name = ?1 AND valid_until IS NULL"
        ))
        .bind(model_name)
        .fetch_optional(&mut *self.db)
        .await?;

        row.map(PriceQuote::try_from).transpose().map_err(Into::into)
    }

    /// Close a quote by setting its valid_until
    #[instrument(skip(self), err)]
    pub async fn close(&mut self, id: PriceQuoteId, until: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE price_quotes SET valid_until = ?2 WHERE id = ?1 AND valid_until IS NULL")
            .bind(id)
            .bind(until)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get the per-token pricing for a model that was effective at a given
    /// timestamp. Used for historical backfills and for tests; the request
    /// hot path resolves against the in-memory snapshot instead.
    ///
    /// Uses a two-step lookup: the open quote first (fast path for recent
    /// events), then a full historical scan with temporal constraints.
    #[instrument(skip(self), err)]
    pub async fn pricing_at(&mut self, model_name: &str, at: DateTime<Utc>) -> Result<Option<(Decimal, Decimal)>> {
        if let Some(current) = self.open_quote(model_name).await?
            && at >= current.valid_from
        {
            return Ok(Some((current.input_price_per_token, current.output_price_per_token)));
        }

        let row = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            r#"
            SELECT {QUOTE_COLUMNS}
            FROM price_quotes
            WHERE model_name = ?1 AND valid_from <= ?2
              AND (valid_until IS NULL OR valid_until > ?2)
            ORDER BY valid_from DESC
            LIMIT 1
            "#
        ))
        .bind(model_name)
        .bind(at)
        .fetch_optional(&mut *self.db)
        .await?;

        let quote = row.map(PriceQuote::try_from).transpose()?;
        Ok(quote.map(|q| (q.input_price_per_token, q.output_price_per_token)))
    }

    /// List all quotes (including historical) for one model, newest first
    #[instrument(skip(self), err)]
    pub async fn list_for_model(&mut self, model_name: &str) -> Result<Vec<PriceQuote>> {
        let rows = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM price_quotes WHERE model_name = ?1 ORDER BY valid_from DESC"
        ))
        .bind(model_name)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|r| PriceQuote::try_from(r).map_err(Into::into))
            .collect()
    }

    /// List every quote in the table, ordered for snapshot construction
    #[instrument(skip(self), err)]
    pub async fn list_all(&mut self) -> Result<Vec<PriceQuote>> {
        let rows = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM price_quotes ORDER BY model_name ASC, valid_from ASC"
        ))
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|r| PriceQuote::try_from(r).map_err(Into::into))
            .collect()
    }

    /// List the open quote of every model, ordered by model name
    #[instrument(skip(self), err)]
    pub async fn list_open(&mut self) -> Result<Vec<PriceQuote>> {
        let rows = sqlx::query_as::<_, PriceQuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM price_quotes WHERE valid_until IS NULL ORDER BY model_name ASC"
        ))
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|r| PriceQuote::try_from(r).map_err(Into::into))
            .collect()
    }
}
