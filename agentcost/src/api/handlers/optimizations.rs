//! Cost-optimization endpoints.

use crate::{
    AppState,
    api::models::optimizations::OptimizationQuery,
    auth::CurrentProject,
    db::{
        handlers::analytics,
        models::analytics::{GroupBy, Window},
    },
    errors::{Error, Result},
    optimizer::{self, AgentModelStats, RuleContext, SavingsSummary, Suggestion},
    pricing::cost,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

const MAX_LOOKBACK_DAYS: i64 = 90;

fn lookback_window(days: i64) -> Result<Window> {
    if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
        return Err(Error::BadRequest {
            message: format!("days must be between 1 and {MAX_LOOKBACK_DAYS}"),
        });
    }
    let end = Utc::now();
    Ok(Window {
        start: end - Duration::days(days),
        end,
    })
}

async fn generate_suggestions(state: &AppState, project_id: crate::types::ProjectId, window: &Window) -> Result<Vec<Suggestion>> {
    let mut conn = state.db.acquire().await?;
    let lines = analytics::aggregate(&mut conn, project_id, window, GroupBy::AgentModel).await?;
    let stats: Vec<AgentModelStats> = lines.iter().filter_map(AgentModelStats::from_stat_line).collect();

    let snapshot = state.pricing.snapshot();
    let ctx = RuleContext {
        pricing: &snapshot,
        window: *window,
        now: window.end,
    };
    let rules = optimizer::default_rules();
    Ok(optimizer::analyze(&stats, &ctx, &rules))
}

/// List cost-optimization suggestions
#[utoipa::path(
    get,
    path = "/v1/optimizations",
    tag = "optimizations",
    params(OptimizationQuery),
    responses(
        (status = 200, description = "Suggestions ranked by estimated monthly savings", body = [Suggestion]),
        (status = 400, description = "Invalid lookback"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn list_suggestions(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<OptimizationQuery>,
) -> Result<Json<Vec<Suggestion>>> {
    let window = lookback_window(query.days)?;
    Ok(Json(generate_suggestions(&state, project.id, &window).await?))
}

/// Savings summary across all current suggestions
#[utoipa::path(
    get,
    path = "/v1/optimizations/summary",
    tag = "optimizations",
    params(OptimizationQuery),
    responses(
        (status = 200, description = "Total potential savings and breakdown by type", body = SavingsSummary),
        (status = 400, description = "Invalid lookback"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<OptimizationQuery>,
) -> Result<Json<SavingsSummary>> {
    let window = lookback_window(query.days)?;
    let suggestions = generate_suggestions(&state, project.id, &window).await?;

    // Current spend, extrapolated to 30 days for context.
    let mut conn = state.db.acquire().await?;
    let mut lines = analytics::aggregate(&mut conn, project.id, &window, GroupBy::None).await?;
    let window_cost = lines.pop().map(|l| cost::from_nanos(l.cost_nanos_or_zero())).unwrap_or(Decimal::ZERO);
    let monthly_spend = window_cost / Decimal::from(window.span_days()) * Decimal::from(30);

    Ok(Json(optimizer::summarize(suggestions, monthly_spend)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SuggestionType;
    use crate::test_utils::{auth_header, create_test_app, create_test_project, ingest_events};
    use serde_json::json;
    use sqlx::SqlitePool;

    /// Twenty short-output gpt-4 calls within the last week: a downgrade
    /// candidate with meaningful spend.
    fn short_output_events() -> serde_json::Value {
        let now = Utc::now();
        let events: Vec<serde_json::Value> = (0..20)
            .map(|i| {
                json!({
                    "agent_name": "summarizer",
                    "model": "gpt-4",
                    "input_tokens": 4000,
                    "output_tokens": 50,
                    "latency_ms": 700,
                    "timestamp": (now - Duration::hours(i + 1)).to_rfc3339(),
                })
            })
            .collect();
        serde_json::Value::Array(events)
    }

    #[sqlx::test]
    #[test_log::test]
    async fn short_output_premium_usage_yields_a_downgrade_suggestion(pool: SqlitePool) {
        let server = create_test_app(pool.clone(), true).await;
        let (_, api_key) = create_test_project(&pool, "downgrade-test").await;
        ingest_events(&server, &api_key, short_output_events()).await;

        let (name, value) = auth_header(&api_key);
        let suggestions: Vec<Suggestion> = server
            .get("/v1/optimizations?days=30")
            .add_header(name, value)
            .await
            .json();

        let downgrade = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::ModelDowngrade)
            .expect("expected a model_downgrade suggestion");
        assert_eq!(downgrade.agent_name, "summarizer");
        assert_eq!(downgrade.alternative_model.as_deref(), Some("gpt-3.5-turbo"));
        assert!(downgrade.estimated_savings_monthly > Decimal::ZERO);
        assert!(downgrade.estimated_savings_percent > 0.0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn idle_projects_get_no_suggestions(pool: SqlitePool) {
        let server = create_test_app(pool.clone(), true).await;
        let (_, api_key) = create_test_project(&pool, "idle-test").await;

        let (name, value) = auth_header(&api_key);
        let suggestions: Vec<Suggestion> = server
            .get("/v1/optimizations?days=30")
            .add_header(name, value)
            .await
            .json();
        assert!(suggestions.is_empty());

        let summary: SavingsSummary = server
            .get("/v1/optimizations/summary?days=30")
            .add_header(auth_header(&api_key).0, auth_header(&api_key).1)
            .await
            .json();
        assert_eq!(summary.suggestion_count, 0);
        assert_eq!(summary.total_potential_savings_monthly, Decimal::ZERO);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn summary_totals_cover_all_suggestions(pool: SqlitePool) {
        let server = create_test_app(pool.clone(), true).await;
        let (_, api_key) = create_test_project(&pool, "summary-test").await;
        ingest_events(&server, &api_key, short_output_events()).await;

        let (name, value) = auth_header(&api_key);
        let suggestions: Vec<Suggestion> = server
            .get("/v1/optimizations?days=30")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        let summary: SavingsSummary = server
            .get("/v1/optimizations/summary?days=30")
            .add_header(name, value)
            .await
            .json();

        let expected_total: Decimal = suggestions.iter().map(|s| s.estimated_savings_monthly).sum();
        assert_eq!(summary.suggestion_count, suggestions.len());
        assert_eq!(summary.total_potential_savings_monthly, expected_total.round_dp(2));
        assert!(summary.current_monthly_spend > Decimal::ZERO);
        assert!(!summary.by_type.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn lookback_bounds_are_enforced(pool: SqlitePool) {
        let server = create_test_app(pool.clone(), true).await;
        let (_, api_key) = create_test_project(&pool, "lookback-test").await;

        let (name, value) = auth_header(&api_key);
        server
            .get("/v1/optimizations?days=0")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);
        server
            .get("/v1/optimizations?days=365")
            .add_header(name, value)
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
