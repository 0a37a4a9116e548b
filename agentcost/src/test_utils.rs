//! Test utilities for integration testing.

use crate::{
    AppState, Config, auth, build_router,
    db::{handlers::Projects, models::projects::ProjectCreateDBRequest},
    pricing::{self, PricingTable, catalog},
    types::ProjectId,
};
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Operator token used by every test configuration
pub const TEST_OPERATOR_TOKEN: &str = "test-operator-token";

pub fn create_test_config() -> Config {
    Config {
        admin_token: Some(TEST_OPERATOR_TOKEN.to_string()),
        ..Config::default()
    }
}

/// Build a [`TestServer`] over a migrated pool. `sync_pricing` seeds the
/// embedded catalog first; pass `false` for tests that need an empty
/// pricing table.
pub async fn create_test_app(pool: SqlitePool, sync_pricing: bool) -> TestServer {
    create_test_app_with_config(pool, create_test_config(), sync_pricing).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config, sync_pricing: bool) -> TestServer {
    if sync_pricing {
        pricing::sync_defaults(&pool, catalog::builtin())
            .await
            .expect("Failed to sync pricing catalog");
    }

    let pricing_table = Arc::new(PricingTable::empty());
    pricing_table.reload(&pool).await.expect("Failed to load pricing snapshot");

    let state = AppState {
        db: pool,
        config,
        pricing: pricing_table,
    };

    TestServer::new(build_router(state)).expect("Failed to create test server")
}

/// Provision a project directly in the database; returns its id and API key.
pub async fn create_test_project(pool: &SqlitePool, name: &str) -> (ProjectId, String) {
    let secret = auth::generate_api_key();

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let mut repo = Projects::new(&mut tx);
    let project = {
        use crate::db::handlers::Repository;
        repo.create(&ProjectCreateDBRequest {
            name: name.to_string(),
            description: None,
        })
        .await
        .expect("Failed to create project")
    };
    repo.create_api_key(project.id, &secret)
        .await
        .expect("Failed to create API key");
    tx.commit().await.expect("Failed to commit");

    (project.id, secret)
}

/// Authorization header for a project API key
pub fn auth_header(api_key: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {api_key}")).expect("valid header value"),
    )
}

/// Authorization header for the test operator token
pub fn operator_header() -> (HeaderName, HeaderValue) {
    auth_header(TEST_OPERATOR_TOKEN)
}

/// Submit events through the batch endpoint and assert they were all stored.
pub async fn ingest_events(server: &TestServer, api_key: &str, events: serde_json::Value) {
    let (name, value) = auth_header(api_key);
    let response = server
        .post("/v1/events/batch")
        .add_header(name, value)
        .json(&serde_json::json!({ "events": events }))
        .await;
    response.assert_status_ok();

    let result: crate::api::models::events::EventBatchResponse = response.json();
    assert!(
        result.rejected.is_empty(),
        "expected a fully accepted batch, got rejections: {:?}",
        result.rejected
    );
}
