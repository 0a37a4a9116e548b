//! Event ingestion request/response types.

use crate::db::models::events::StoredEvent;
use crate::pricing::cost;
use crate::types::EventId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_agent_name() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

/// One usage event as submitted by an SDK.
///
/// Events arrive inside a batch as raw JSON values and are deserialized
/// individually, so one malformed event never fails the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventInput {
    /// Logical agent that made the call
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Model the call was billed against
    #[serde(default)]
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
    /// When the call happened (event time, not submission time)
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub success: bool,
    /// Error message for failed calls
    #[serde(default)]
    pub error: Option<String>,
    /// Opaque key-value extension map; stored, never interpreted
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Client-supplied retry deduplication token; derived from content when
    /// absent
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Request body for batch event ingestion. Events are raw values so that
/// per-event deserialization failures reject only that event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EventBatchRequest {
    #[schema(value_type = Vec<EventInput>)]
    pub events: Vec<serde_json::Value>,
}

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// The event JSON did not deserialize into the expected shape
    Malformed,
    MissingModel,
    NegativeTokens,
    NegativeLatency,
    /// Metadata must be a JSON object when present
    InvalidMetadata,
    /// No price quote applies to (model, timestamp) and the policy is reject
    UnknownPricing,
}

/// Whether an accepted event wrote a new row or matched an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedStatus {
    Stored,
    /// The idempotency key was already recorded; the retry is acknowledged
    /// without writing a duplicate row
    Duplicate,
}

/// One accepted event in a batch response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcceptedEvent {
    /// Index of the event in the submitted batch
    pub index: usize,
    #[schema(value_type = String, format = "uuid")]
    pub event_id: EventId,
    pub status: AcceptedStatus,
    /// Priced cost in USD; null when the cost is unknown
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
}

/// One rejected event in a batch response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectedEvent {
    /// Index of the event in the submitted batch
    pub index: usize,
    pub kind: RejectKind,
    pub message: String,
}

/// Batch ingestion result. `accepted.len() + rejected.len()` always equals
/// the submitted batch size, and both lists are ordered by batch index.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventBatchResponse {
    pub accepted: Vec<AcceptedEvent>,
    pub rejected: Vec<RejectedEvent>,
    /// Number of newly stored rows (excludes duplicates)
    pub events_stored: usize,
}

/// Query parameters for listing recent events
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListEventsQuery {
    /// Maximum number of events to return (default: 50, max: 1000)
    pub limit: Option<i64>,
    /// Number of events to skip for pagination
    pub offset: Option<i64>,
}

/// Single stored event response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EventId,
    pub agent_name: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    /// Priced cost in USD; null when the cost is unknown
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub latency_ms: i64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl From<StoredEvent> for EventResponse {
    fn from(event: StoredEvent) -> Self {
        Self {
            id: event.id,
            agent_name: event.agent_name,
            model: event.model_name,
            input_tokens: event.input_tokens,
            output_tokens: event.output_tokens,
            total_tokens: event.input_tokens + event.output_tokens,
            cost: event.cost_nanos.map(cost::from_nanos),
            latency_ms: event.latency_ms,
            timestamp: event.timestamp,
            success: event.success,
            error: event.error,
            metadata: event.metadata,
        }
    }
}
