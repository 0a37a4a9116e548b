//! Database models for usage events.

use crate::types::{EventId, ProjectId};
use chrono::{DateTime, Utc};

/// Raw database row for a stored event. Metadata is an opaque JSON TEXT
/// column, deserialized lazily at the API boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: EventId,
    pub project_id: ProjectId,
    pub agent_name: String,
    pub model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub cost_nanos: Option<i64>,
    pub idempotency_key: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored usage event with the metadata map decoded.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: EventId,
    pub project_id: ProjectId,
    pub agent_name: String,
    pub model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub cost_nanos: Option<i64>,
    pub idempotency_key: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(StoredEvent {
            id: row.id,
            project_id: row.project_id,
            agent_name: row.agent_name,
            model_name: row.model_name,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            latency_ms: row.latency_ms,
            success: row.success,
            error: row.error,
            timestamp: row.timestamp,
            cost_nanos: row.cost_nanos,
            idempotency_key: row.idempotency_key,
            metadata,
            created_at: row.created_at,
        })
    }
}

/// Request to insert a new event. The caller has already validated field
/// ranges and resolved the cost; `cost_nanos = None` records an unknown cost.
#[derive(Debug, Clone)]
pub struct EventInsertDBRequest {
    pub id: EventId,
    pub project_id: ProjectId,
    pub agent_name: String,
    pub model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub cost_nanos: Option<i64>,
    pub idempotency_key: String,
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of an idempotent event insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Stored,
    /// The (project, idempotency_key) pair already exists; nothing written
    Duplicate,
}
