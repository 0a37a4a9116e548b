//! Pure cost arithmetic.
//!
//! Costs are computed in [`Decimal`] and persisted as `i64` nano-USD so that
//! SQL aggregation over millions of events is exact integer arithmetic.
//! Rounding to the nano-USD grid happens exactly once, at event-pricing time.

use crate::db::models::pricing::PriceQuote;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Nano-USD per USD: stored costs are fixed-point with nine decimal places.
pub const NANOS_PER_USD: i64 = 1_000_000_000;

/// Compute the monetary cost of one event against a price quote.
///
/// `cost = input_tokens × input_unit_price + output_tokens × output_unit_price`
///
/// Token counts must already be validated non-negative; zero tokens yield a
/// zero cost.
pub fn event_cost(input_tokens: i64, output_tokens: i64, quote: &PriceQuote) -> Decimal {
    debug_assert!(input_tokens >= 0 && output_tokens >= 0);
    Decimal::from(input_tokens) * quote.input_price_per_token
        + Decimal::from(output_tokens) * quote.output_price_per_token
}

/// Convert a USD amount to nano-USD, rounding half away from zero at the
/// ninth decimal place. Returns `None` on overflow (a cost beyond ~9.2
/// billion USD, which no single event reaches).
pub fn to_nanos(usd: Decimal) -> Option<i64> {
    (usd * Decimal::from(NANOS_PER_USD))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert stored nano-USD back to a USD decimal (scale 9).
pub fn from_nanos(nanos: i64) -> Decimal {
    Decimal::new(nanos, 9)
}
