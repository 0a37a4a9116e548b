//! Analytics report endpoints.
//!
//! All five endpoints project the same aggregation shape (see
//! [`crate::db::handlers::analytics`]); the `full` report runs its queries
//! inside one read transaction so its sections describe the same instant.

use crate::{
    AppState,
    api::models::analytics::{
        AgentStats, AnalyticsOverview, AnalyticsResponse, ModelStats, TimeSeriesPoint, TimeSeriesQuery, WindowQuery,
    },
    auth::CurrentProject,
    db::{
        handlers::analytics,
        models::analytics::{BucketWidth, GroupBy, StatLine, Window},
    },
    errors::{Error, Result},
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;

/// Resolve optional window bounds to a validated half-open window.
/// Defaults: the 30 days ending now.
pub(crate) fn resolve_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    max_window_days: i64,
) -> Result<Window> {
    let end = end.unwrap_or_else(Utc::now);
    let start = start.unwrap_or(end - Duration::days(30));

    if start >= end {
        return Err(Error::BadRequest {
            message: format!("window start {start} must be before end {end}"),
        });
    }
    if end - start > Duration::days(max_window_days) {
        return Err(Error::BadRequest {
            message: format!("window exceeds the maximum span of {max_window_days} days"),
        });
    }
    Ok(Window { start, end })
}

/// The overview line for a window. GroupBy::None always yields exactly one
/// aggregate row, even over an empty window.
async fn overview_line(
    conn: &mut SqliteConnection,
    project_id: crate::types::ProjectId,
    window: &Window,
) -> Result<StatLine> {
    let mut lines = analytics::aggregate(conn, project_id, window, GroupBy::None).await?;
    lines.pop().ok_or(Error::Internal {
        operation: "compute overview aggregate".to_string(),
    })
}

fn timeseries_points(lines: &[StatLine]) -> Result<Vec<TimeSeriesPoint>> {
    lines
        .iter()
        .map(|l| TimeSeriesPoint::from_stat_line(l).map_err(Error::Other))
        .collect()
}

/// Project-wide totals for a window
#[utoipa::path(
    get,
    path = "/v1/analytics/overview",
    tag = "analytics",
    params(WindowQuery),
    responses(
        (status = 200, description = "Aggregated totals for the window", body = AnalyticsOverview),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn overview(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<WindowQuery>,
) -> Result<Json<AnalyticsOverview>> {
    let window = resolve_window(query.start, query.end, state.config.analytics.max_window_days)?;

    let mut conn = state.db.acquire().await?;
    let line = overview_line(&mut conn, project.id, &window).await?;

    Ok(Json(AnalyticsOverview::from_stat_line(&line, &window)))
}

/// Per-agent breakdown for a window
#[utoipa::path(
    get,
    path = "/v1/analytics/agents",
    tag = "analytics",
    params(WindowQuery),
    responses(
        (status = 200, description = "Per-agent statistics, largest spend first", body = [AgentStats]),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn agents(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<AgentStats>>> {
    let window = resolve_window(query.start, query.end, state.config.analytics.max_window_days)?;

    let mut conn = state.db.acquire().await?;
    let lines = analytics::aggregate(&mut conn, project.id, &window, GroupBy::Agent).await?;

    Ok(Json(lines.iter().map(AgentStats::from_stat_line).collect()))
}

/// Per-model breakdown for a window
#[utoipa::path(
    get,
    path = "/v1/analytics/models",
    tag = "analytics",
    params(WindowQuery),
    responses(
        (status = 200, description = "Per-model statistics, largest spend first", body = [ModelStats]),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn models(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<ModelStats>>> {
    let window = resolve_window(query.start, query.end, state.config.analytics.max_window_days)?;

    let mut conn = state.db.acquire().await?;
    let lines = analytics::aggregate(&mut conn, project.id, &window, GroupBy::Model).await?;

    Ok(Json(ModelStats::from_stat_lines(&lines)))
}

/// Time series for a window
#[utoipa::path(
    get,
    path = "/v1/analytics/timeseries",
    tag = "analytics",
    params(TimeSeriesQuery),
    responses(
        (status = 200, description = "Bucketed statistics in chronological order", body = [TimeSeriesPoint]),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn timeseries(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<TimeSeriesQuery>,
) -> Result<Json<Vec<TimeSeriesPoint>>> {
    let window = resolve_window(query.start, query.end, state.config.analytics.max_window_days)?;
    let bucket = query.bucket.unwrap_or(BucketWidth::Day);

    let mut conn = state.db.acquire().await?;
    let lines = analytics::aggregate(&mut conn, project.id, &window, GroupBy::TimeBucket(bucket)).await?;

    Ok(Json(timeseries_points(&lines)?))
}

/// Every report shape for one window in a single response
#[utoipa::path(
    get,
    path = "/v1/analytics/full",
    tag = "analytics",
    params(TimeSeriesQuery),
    responses(
        (status = 200, description = "Combined overview, per-agent, per-model and time-series report", body = AnalyticsResponse),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn full(
    State(state): State<AppState>,
    project: CurrentProject,
    Query(query): Query<TimeSeriesQuery>,
) -> Result<Json<AnalyticsResponse>> {
    let window = resolve_window(query.start, query.end, state.config.analytics.max_window_days)?;
    let bucket = query.bucket.unwrap_or(BucketWidth::Day);

    // One read transaction: all four sections see the same event set.
    let mut tx = state.db.begin().await?;
    let overview_line = overview_line(&mut tx, project.id, &window).await?;
    let agent_lines = analytics::aggregate(&mut tx, project.id, &window, GroupBy::Agent).await?;
    let model_lines = analytics::aggregate(&mut tx, project.id, &window, GroupBy::Model).await?;
    let bucket_lines = analytics::aggregate(&mut tx, project.id, &window, GroupBy::TimeBucket(bucket)).await?;
    tx.commit().await?;

    Ok(Json(AnalyticsResponse {
        overview: AnalyticsOverview::from_stat_line(&overview_line, &window),
        agents: agent_lines.iter().map(AgentStats::from_stat_line).collect(),
        models: ModelStats::from_stat_lines(&model_lines),
        timeseries: timeseries_points(&bucket_lines)?,
    }))
}
