//! Database models for model price quotes.

use crate::types::PriceQuoteId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provenance of a price quote. `Default`-origin quotes are managed by the
/// catalog sync; `Override` quotes were set by an operator and are never
/// touched by sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuoteOrigin {
    Default,
    Override,
}

impl QuoteOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteOrigin::Default => "default",
            QuoteOrigin::Override => "override",
        }
    }
}

impl FromStr for QuoteOrigin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(QuoteOrigin::Default),
            "override" => Ok(QuoteOrigin::Override),
            other => Err(anyhow::anyhow!("unknown quote origin: {other}")),
        }
    }
}

impl fmt::Display for QuoteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw database row for a price quote. Prices are stored as decimal TEXT
/// since SQLite has no native decimal type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceQuoteRow {
    pub id: PriceQuoteId,
    pub model_name: String,
    pub provider: Option<String>,
    pub input_price_per_token: String,
    pub output_price_per_token: String,
    pub currency: String,
    pub origin: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A time-bounded per-token price for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub id: PriceQuoteId,
    pub model_name: String,
    pub provider: Option<String>,
    pub input_price_per_token: Decimal,
    pub output_price_per_token: Decimal,
    pub currency: String,
    pub origin: QuoteOrigin,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PriceQuoteRow> for PriceQuote {
    type Error = anyhow::Error;

    fn try_from(row: PriceQuoteRow) -> Result<Self, Self::Error> {
        Ok(PriceQuote {
            id: row.id,
            model_name: row.model_name,
            provider: row.provider,
            input_price_per_token: Decimal::from_str(&row.input_price_per_token)?,
            output_price_per_token: Decimal::from_str(&row.output_price_per_token)?,
            currency: row.currency,
            origin: row.origin.parse()?,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            created_at: row.created_at,
        })
    }
}

/// Request to insert a new price quote
#[derive(Debug, Clone)]
pub struct QuoteCreateDBRequest {
    pub model_name: String,
    pub provider: Option<String>,
    pub input_price_per_token: Decimal,
    pub output_price_per_token: Decimal,
    pub currency: String,
    pub origin: QuoteOrigin,
    pub valid_from: DateTime<Utc>,
}
