//! End-to-end integration tests: full ingest → price → aggregate →
//! optimize journeys through the HTTP API.

use crate::api::models::analytics::AnalyticsOverview;
use crate::api::models::events::{AcceptedStatus, EventBatchResponse, EventResponse};
use crate::test_utils::{auth_header, create_test_app, create_test_project, operator_header};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::SqlitePool;
use std::str::FromStr;

/// Full user journey: operator provisions a project, an SDK ingests a
/// batch, and the analytics reconcile to hand-computed totals.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_ingest_and_analytics_journey(pool: SqlitePool) {
    let server = create_test_app(pool, true).await;

    // Operator provisions the tenant.
    let (op_name, op_value) = operator_header();
    let response = server
        .post("/v1/projects")
        .add_header(op_name, op_value)
        .json(&json!({"name": "prod-assistant"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let api_key = response.json::<serde_json::Value>()["api_key"]
        .as_str()
        .expect("api_key in provisioning response")
        .to_string();

    // SDK submits a batch.
    let (name, value) = auth_header(&api_key);
    let result: EventBatchResponse = server
        .post("/v1/events/batch")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "events": [
                {"agent_name": "agentA", "model": "gpt-4", "input_tokens": 100, "output_tokens": 50,
                 "latency_ms": 800, "timestamp": "2025-06-01T10:00:00Z", "success": true,
                 "metadata": {"session": "abc"}},
                {"agent_name": "agentA", "model": "gpt-4", "input_tokens": 200, "output_tokens": 0,
                 "latency_ms": 900, "timestamp": "2025-06-01T11:00:00Z", "success": false,
                 "error": "rate limited"},
                {"agent_name": "agentB", "model": "gpt-3.5-turbo", "input_tokens": 500, "output_tokens": 500,
                 "latency_ms": 400, "timestamp": "2025-06-02T09:00:00Z", "success": true},
            ]
        }))
        .await
        .json();
    assert_eq!(result.accepted.len(), 3);
    assert_eq!(result.events_stored, 3);
    assert_eq!(result.accepted[0].cost, Some(Decimal::from_str("0.006000000").unwrap()));

    // Events listing round-trips the stored fields.
    let events: Vec<EventResponse> = server
        .get("/v1/events")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(events.len(), 3);
    let failed = events.iter().find(|e| !e.success).unwrap();
    assert_eq!(failed.error.as_deref(), Some("rate limited"));
    let with_meta = events.iter().find(|e| e.metadata.is_some()).unwrap();
    assert_eq!(with_meta.metadata.as_ref().unwrap()["session"], "abc");

    // Analytics totals reconcile.
    let overview: AnalyticsOverview = server
        .get("/v1/analytics/overview?start=2025-06-01T00:00:00Z&end=2025-06-03T00:00:00Z")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(overview.total_calls, 3);
    assert_eq!(overview.total_cost, Decimal::from_str("0.01375").unwrap());
    assert_eq!(overview.success_rate, 66.67);
}

/// Events timestamped before a pricing update must keep pricing from the
/// quote effective at event time, not the newly updated quote.
#[sqlx::test]
#[test_log::test]
async fn test_pricing_update_does_not_reprice_history(pool: SqlitePool) {
    let server = create_test_app(pool.clone(), true).await;
    let (_, api_key) = create_test_project(&pool, "repricing-test").await;

    let historical_event = |key: &str| {
        json!({
            "events": [
                {"agent_name": "a", "model": "gpt-4", "input_tokens": 1000, "output_tokens": 0,
                 "latency_ms": 100, "timestamp": "2025-06-01T10:00:00Z", "idempotency_key": key},
            ]
        })
    };

    // Ingest under the catalog price: 1000 * 0.00003 = $0.03.
    let (name, value) = auth_header(&api_key);
    let before: EventBatchResponse = server
        .post("/v1/events/batch")
        .add_header(name.clone(), value.clone())
        .json(&historical_event("evt-before"))
        .await
        .json();
    let old_cost = before.accepted[0].cost.unwrap();
    assert_eq!(old_cost, Decimal::from_str("0.03").unwrap());

    // Operator doubles the price, effective now.
    let (op_name, op_value) = operator_header();
    server
        .post("/v1/pricing/models")
        .add_header(op_name, op_value)
        .json(&json!({
            "model_name": "gpt-4",
            "input_price_per_token": "0.00006",
            "output_price_per_token": "0.00012"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    // Retrying the original submission is a duplicate with the stored cost.
    let retried: EventBatchResponse = server
        .post("/v1/events/batch")
        .add_header(name.clone(), value.clone())
        .json(&historical_event("evt-before"))
        .await
        .json();
    assert_eq!(retried.accepted[0].status, AcceptedStatus::Duplicate);
    assert_eq!(retried.accepted[0].cost, Some(old_cost));

    // A new event with the same historical timestamp still prices against
    // the quote that was effective back then.
    let backfilled: EventBatchResponse = server
        .post("/v1/events/batch")
        .add_header(name.clone(), value.clone())
        .json(&historical_event("evt-backfill"))
        .await
        .json();
    assert_eq!(backfilled.accepted[0].status, AcceptedStatus::Stored);
    assert_eq!(backfilled.accepted[0].cost, Some(old_cost));

    // An event after the update prices against the new quote.
    let now = chrono::Utc::now();
    let fresh: EventBatchResponse = server
        .post("/v1/events/batch")
        .add_header(name, value)
        .json(&json!({
            "events": [
                {"agent_name": "a", "model": "gpt-4", "input_tokens": 1000, "output_tokens": 0,
                 "latency_ms": 100, "timestamp": now.to_rfc3339(), "idempotency_key": "evt-after"},
            ]
        }))
        .await
        .json();
    assert_eq!(fresh.accepted[0].cost, Some(Decimal::from_str("0.06").unwrap()));
}

/// An API key only ever reads and writes its own project, whatever other
/// tenants exist.
#[sqlx::test]
#[test_log::test]
async fn test_tenant_isolation_end_to_end(pool: SqlitePool) {
    let server = create_test_app(pool.clone(), true).await;
    let (project_a, key_a) = create_test_project(&pool, "tenant-a").await;
    let (project_b, key_b) = create_test_project(&pool, "tenant-b").await;
    assert_ne!(project_a, project_b);

    let (name_a, value_a) = auth_header(&key_a);
    server
        .post("/v1/events/batch")
        .add_header(name_a, value_a)
        .json(&json!({
            "events": [
                {"agent_name": "a", "model": "gpt-4", "input_tokens": 10, "output_tokens": 10,
                 "latency_ms": 5, "timestamp": "2025-06-01T10:00:00Z"},
            ]
        }))
        .await
        .assert_status_ok();

    let (name_b, value_b) = auth_header(&key_b);
    let events: Vec<EventResponse> = server.get("/v1/events").add_header(name_b, value_b).await.json();
    assert!(events.is_empty());

    let revoked = auth_header("ac-not-a-real-key");
    server
        .get("/v1/events")
        .add_header(revoked.0, revoked.1)
        .await
        .assert_status_unauthorized();
}
