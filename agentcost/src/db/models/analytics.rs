//! Aggregation primitives shared by every analytics report shape.

use chrono::{DateTime, Utc};

/// Half-open aggregation window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Window span in whole days, rounded up, never below 1. Used for
    /// extrapolating window costs to monthly figures.
    pub fn span_days(&self) -> i64 {
        let secs = (self.end - self.start).num_seconds().max(0);
        ((secs + 86_399) / 86_400).max(1)
    }
}

/// Grouping dimension for the single aggregation query shape. Every report
/// (overview, per-agent, per-model, optimizer input, time series) is a
/// projection of the same SELECT, which is what makes cross-report totals
/// consistent by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    None,
    Agent,
    Model,
    AgentModel,
    TimeBucket(BucketWidth),
}

/// Time-bucket width for time-series aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BucketWidth {
    Hour,
    Day,
}

impl BucketWidth {
    /// SQLite expression formatting an event timestamp down to its bucket
    /// start, rendered as RFC 3339 UTC.
    pub fn bucket_expr(&self) -> &'static str {
        match self {
            BucketWidth::Hour => "strftime('%Y-%m-%dT%H:00:00Z', timestamp)",
            BucketWidth::Day => "strftime('%Y-%m-%dT00:00:00Z', timestamp)",
        }
    }
}

/// One aggregated line as returned by the storage engine. `key_a`/`key_b`
/// carry the grouping dimension values (agent, model, bucket start) and are
/// NULL for ungrouped dimensions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatLine {
    pub key_a: Option<String>,
    pub key_b: Option<String>,
    pub total_calls: i64,
    pub successful_calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_nanos: Option<i64>,
    pub avg_latency_ms: Option<f64>,
}

impl StatLine {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }

    /// successful/total × 100, defined as 0 when there are no calls.
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        let rate = self.successful_calls as f64 / self.total_calls as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    pub fn cost_nanos_or_zero(&self) -> i64 {
        self.cost_nanos.unwrap_or(0)
    }

    pub fn avg_latency_or_zero(&self) -> f64 {
        self.avg_latency_ms.unwrap_or(0.0)
    }
}
