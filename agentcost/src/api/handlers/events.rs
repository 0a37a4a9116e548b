//! Event ingestion and listing.
//!
//! The batch ingestor is the tenant-isolation boundary: the project every
//! event is written under comes from the authenticated API key, never from
//! the payload. Per-event failures reject only that event; the batch
//! response reports accepted and rejected entries in request order.

use crate::{
    AppState,
    api::models::events::{
        AcceptedEvent, AcceptedStatus, EventBatchRequest, EventBatchResponse, EventInput, EventResponse, ListEventsQuery,
        RejectKind, RejectedEvent,
    },
    auth::CurrentProject,
    config::UnknownModelPolicy,
    db::{
        handlers::Events,
        models::events::{EventInsertDBRequest, InsertOutcome},
    },
    errors::{Error, Result},
    pricing::cost,
    types::EventId,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

/// Shallow per-event validation, before any pricing or storage work.
fn validate(input: &EventInput) -> std::result::Result<(), (RejectKind, String)> {
    if input.model.trim().is_empty() {
        return Err((RejectKind::MissingModel, "model is required".to_string()));
    }
    if input.input_tokens < 0 || input.output_tokens < 0 {
        return Err((
            RejectKind::NegativeTokens,
            format!(
                "token counts must be non-negative (got {}/{})",
                input.input_tokens, input.output_tokens
            ),
        ));
    }
    if input.latency_ms < 0 {
        return Err((
            RejectKind::NegativeLatency,
            format!("latency_ms must be non-negative (got {})", input.latency_ms),
        ));
    }
    if let Some(metadata) = &input.metadata
        && !metadata.is_object()
    {
        return Err((
            RejectKind::InvalidMetadata,
            "metadata must be a JSON object".to_string(),
        ));
    }
    Ok(())
}

/// Derive a deterministic idempotency key from the identifying fields of an
/// event. Stable across retries of an identical payload, distinct for
/// distinct payloads.
fn derive_idempotency_key(input: &EventInput) -> String {
    let parts = [
        input.agent_name.clone(),
        input.model.clone(),
        input.input_tokens.to_string(),
        input.output_tokens.to_string(),
        input.latency_ms.to_string(),
        input.timestamp.to_rfc3339(),
    ];

    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Ingest a batch of usage events
#[utoipa::path(
    post,
    path = "/v1/events/batch",
    tag = "events",
    request_body = EventBatchRequest,
    responses(
        (status = 200, description = "Batch processed; see per-event results", body = EventBatchResponse),
        (status = 400, description = "Empty batch or batch exceeds the size limit"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Storage unavailable; the batch may be retried"),
    )
)]
#[instrument(skip(state, request), fields(project_id = %project.id, batch_size = request.events.len()))]
pub async fn ingest_batch(
    State(state): State<AppState>,
    project: CurrentProject,
    Json(request): Json<EventBatchRequest>,
) -> Result<Json<EventBatchResponse>> {
    if request.events.is_empty() {
        return Err(Error::BadRequest {
            message: "batch must contain at least one event".to_string(),
        });
    }
    let max = state.config.ingest.max_batch_size;
    if request.events.len() > max {
        return Err(Error::BadRequest {
            message: format!("batch size {} exceeds the limit of {max}", request.events.len()),
        });
    }

    // One snapshot for the whole batch: every event prices against the same
    // consistent view of the quote table.
    let snapshot = state.pricing.snapshot();
    let policy = state.config.pricing.unknown_model_policy;

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut events_stored = 0usize;

    // All stored rows of a batch commit atomically.
    let mut tx = state.db.begin().await?;
    let mut repo = Events::new(&mut tx);

    for (index, raw) in request.events.into_iter().enumerate() {
        let input: EventInput = match serde_json::from_value(raw) {
            Ok(input) => input,
            Err(e) => {
                rejected.push(RejectedEvent {
                    index,
                    kind: RejectKind::Malformed,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Err((kind, message)) = validate(&input) {
            rejected.push(RejectedEvent { index, kind, message });
            continue;
        }

        // Price at the event's reported timestamp, not ingestion time, so
        // historical backfills use the quote that was effective back then.
        let cost_nanos = match snapshot.resolve(&input.model, input.timestamp) {
            Some(quote) => {
                let usd = cost::event_cost(input.input_tokens, input.output_tokens, quote);
                match cost::to_nanos(usd) {
                    Some(nanos) => Some(nanos),
                    None => {
                        return Err(Error::Internal {
                            operation: format!("represent event cost {usd} in fixed point"),
                        });
                    }
                }
            }
            None => match policy {
                UnknownModelPolicy::Reject => {
                    rejected.push(RejectedEvent {
                        index,
                        kind: RejectKind::UnknownPricing,
                        message: format!("no pricing available for model '{}' at {}", input.model, input.timestamp),
                    });
                    continue;
                }
                UnknownModelPolicy::Accept => None,
            },
        };

        let idempotency_key = input
            .idempotency_key
            .clone()
            .unwrap_or_else(|| derive_idempotency_key(&input));

        let event_id: EventId = Uuid::new_v4();
        let insert = EventInsertDBRequest {
            id: event_id,
            project_id: project.id,
            agent_name: input.agent_name,
            model_name: input.model,
            input_tokens: input.input_tokens,
            output_tokens: input.output_tokens,
            latency_ms: input.latency_ms,
            success: input.success,
            error: input.error,
            timestamp: input.timestamp,
            cost_nanos,
            idempotency_key: idempotency_key.clone(),
            metadata: input.metadata,
        };

        match repo.insert(&insert).await? {
            InsertOutcome::Stored => {
                events_stored += 1;
                accepted.push(AcceptedEvent {
                    index,
                    event_id,
                    status: AcceptedStatus::Stored,
                    cost: cost_nanos.map(cost::from_nanos),
                });
            }
            InsertOutcome::Duplicate => {
                // A retry of something already recorded: acknowledge it with
                // the stored event's identity rather than erroring.
                let existing = repo
                    .get_by_idempotency_key(project.id, &idempotency_key)
                    .await?
                    .ok_or_else(|| Error::Internal {
                        operation: "load existing event for duplicate idempotency key".to_string(),
                    })?;
                accepted.push(AcceptedEvent {
                    index,
                    event_id: existing.id,
                    status: AcceptedStatus::Duplicate,
                    cost: existing.cost_nanos.map(cost::from_nanos),
                });
            }
        }
    }

    tx.commit().await?;

    Ok(Json(EventBatchResponse {
        accepted,
        rejected,
        events_stored,
    }))
}

/// List a project's most recent events
#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Recent events, newest first", body = [EventResponse]),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<ListEventsQuery>,
) -> Result<(StatusCode, Json<Vec<EventResponse>>)> {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut conn = state.db.acquire().await?;
    let events = Events::new(&mut conn).list_recent(project.id, limit, offset).await?;

    Ok((StatusCode::OK, Json(events.into_iter().map(EventResponse::from).collect())))
}
