//! Analytics report shapes.
//!
//! Every response here is a projection of the same [`StatLine`] aggregation
//! (see [`crate::db::handlers::analytics`]), which is what keeps the
//! overview totals and the per-dimension breakdowns mutually consistent.

use crate::db::models::analytics::{BucketWidth, StatLine, Window};
use crate::pricing::cost;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters shared by all analytics endpoints. Both bounds are
/// optional; the default window is the 30 days ending now.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Window start (inclusive), RFC 3339
    pub start: Option<DateTime<Utc>>,
    /// Window end (exclusive), RFC 3339
    pub end: Option<DateTime<Utc>>,
}

/// Query parameters for the time-series endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TimeSeriesQuery {
    /// Window start (inclusive), RFC 3339
    pub start: Option<DateTime<Utc>>,
    /// Window end (exclusive), RFC 3339
    pub end: Option<DateTime<Utc>>,
    /// Bucket width (default: day)
    pub bucket: Option<BucketWidth>,
}

/// Overview analytics response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsOverview {
    /// Total priced cost over the window, USD
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub total_calls: i64,
    pub total_tokens: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    #[schema(value_type = String)]
    pub avg_cost_per_call: Decimal,
    pub avg_tokens_per_call: f64,
    pub avg_latency_ms: f64,
    /// successful/total × 100; 0 when the window has no calls
    pub success_rate: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl AnalyticsOverview {
    pub fn from_stat_line(line: &StatLine, window: &Window) -> Self {
        let total_cost = cost::from_nanos(line.cost_nanos_or_zero());
        let calls = line.total_calls;
        let avg_cost_per_call = if calls > 0 {
            (total_cost / Decimal::from(calls)).round_dp(9)
        } else {
            Decimal::ZERO
        };
        let avg_tokens_per_call = if calls > 0 {
            (line.total_tokens() as f64 / calls as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total_cost,
            total_calls: calls,
            total_tokens: line.total_tokens(),
            total_input_tokens: line.input_tokens,
            total_output_tokens: line.output_tokens,
            avg_cost_per_call,
            avg_tokens_per_call,
            avg_latency_ms: line.avg_latency_or_zero(),
            success_rate: line.success_rate(),
            period_start: window.start,
            period_end: window.end,
        }
    }
}

/// Stats for a single agent
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentStats {
    pub agent_name: String,
    pub total_calls: i64,
    pub total_tokens: i64,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
}

impl AgentStats {
    pub fn from_stat_line(line: &StatLine) -> Self {
        Self {
            agent_name: line.key_a.clone().unwrap_or_default(),
            total_calls: line.total_calls,
            total_tokens: line.total_tokens(),
            total_cost: cost::from_nanos(line.cost_nanos_or_zero()),
            avg_latency_ms: line.avg_latency_or_zero(),
            success_rate: line.success_rate(),
        }
    }
}

/// Stats for a single model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelStats {
    pub model: String,
    pub total_calls: i64,
    pub total_tokens: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
    /// This model's share of the window's total cost, percent
    pub cost_share: f64,
}

impl ModelStats {
    pub fn from_stat_lines(lines: &[StatLine]) -> Vec<Self> {
        let window_total: i64 = lines.iter().map(|l| l.cost_nanos_or_zero()).sum();

        lines
            .iter()
            .map(|line| {
                let nanos = line.cost_nanos_or_zero();
                let cost_share = if window_total > 0 {
                    (nanos as f64 / window_total as f64 * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                Self {
                    model: line.key_a.clone().unwrap_or_default(),
                    total_calls: line.total_calls,
                    total_tokens: line.total_tokens(),
                    input_tokens: line.input_tokens,
                    output_tokens: line.output_tokens,
                    total_cost: cost::from_nanos(nanos),
                    avg_latency_ms: line.avg_latency_or_zero(),
                    success_rate: line.success_rate(),
                    cost_share,
                }
            })
            .collect()
    }
}

/// Single point in a time series. `bucket_start` is the inclusive start of
/// the half-open bucket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimeSeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub calls: i64,
    pub tokens: i64,
    #[schema(value_type = String)]
    pub cost: Decimal,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
}

impl TimeSeriesPoint {
    pub fn from_stat_line(line: &StatLine) -> anyhow::Result<Self> {
        let raw = line
            .key_a
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("time bucket line missing bucket key"))?;
        let bucket_start = DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc);

        Ok(Self {
            bucket_start,
            calls: line.total_calls,
            tokens: line.total_tokens(),
            cost: cost::from_nanos(line.cost_nanos_or_zero()),
            avg_latency_ms: line.avg_latency_or_zero(),
            success_rate: line.success_rate(),
        })
    }
}

/// Full analytics response combining every report shape
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub overview: AnalyticsOverview,
    pub agents: Vec<AgentStats>,
    pub models: Vec<ModelStats>,
    pub timeseries: Vec<TimeSeriesPoint>,
}
