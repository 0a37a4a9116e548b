//! Pricing API types.

use crate::db::models::pricing::{PriceQuote, QuoteOrigin};
use crate::types::PriceQuoteId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// API response for a price quote
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PriceQuoteId,
    pub model_name: String,
    pub provider: Option<String>,
    /// Input price per token (returned as string to preserve precision)
    #[schema(value_type = String)]
    pub input_price_per_token: Decimal,
    /// Output price per token (returned as string to preserve precision)
    #[schema(value_type = String)]
    pub output_price_per_token: Decimal,
    pub currency: String,
    pub origin: QuoteOrigin,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Indicates whether this quote is currently open (valid_until IS NULL)
    pub is_active: bool,
}

impl From<PriceQuote> for QuoteResponse {
    fn from(quote: PriceQuote) -> Self {
        Self {
            id: quote.id,
            model_name: quote.model_name,
            provider: quote.provider,
            input_price_per_token: quote.input_price_per_token,
            output_price_per_token: quote.output_price_per_token,
            currency: quote.currency,
            origin: quote.origin,
            is_active: quote.valid_until.is_none(),
            valid_from: quote.valid_from,
            valid_until: quote.valid_until,
        }
    }
}

/// Query parameters for listing quotes
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListQuotesQuery {
    /// Restrict to one model; with `history`, includes closed quotes
    pub model: Option<String>,
    /// Include closed quotes (requires `model`)
    pub history: Option<bool>,
}

/// Operator request to set a model's price. Always recorded as an
/// `override`-origin quote, which catalog syncs will never clobber.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteCreateRequest {
    pub model_name: String,
    pub provider: Option<String>,
    /// Input price per token, USD
    #[schema(value_type = String)]
    pub input_price_per_token: Decimal,
    /// Output price per token, USD
    #[schema(value_type = String)]
    pub output_price_per_token: Decimal,
    /// When the new price takes effect (default: now). Must be after the
    /// current open quote's valid_from.
    pub valid_from: Option<DateTime<Utc>>,
}
