//! OpenAPI document assembly.

use utoipa::OpenApi;

use crate::api::models::{
    analytics::{AgentStats, AnalyticsOverview, AnalyticsResponse, ModelStats, TimeSeriesPoint},
    events::{
        AcceptedEvent, AcceptedStatus, EventBatchRequest, EventBatchResponse, EventInput, EventResponse, RejectKind,
        RejectedEvent,
    },
    pricing::{QuoteCreateRequest, QuoteResponse},
    projects::{HealthResponse, ProjectCreate, ProjectCreatedResponse, ProjectResponse, ProjectUpdate},
};
use crate::db::models::analytics::BucketWidth;
use crate::db::models::pricing::QuoteOrigin;
use crate::optimizer::{Priority, SavingsSummary, Suggestion, SuggestionType, TypeBreakdown};
use crate::pricing::SyncReport;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgentCost API",
        description = "Cost tracking and analytics for LLM agents",
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::events::ingest_batch,
        crate::api::handlers::events::list_events,
        crate::api::handlers::analytics::overview,
        crate::api::handlers::analytics::agents,
        crate::api::handlers::analytics::models,
        crate::api::handlers::analytics::timeseries,
        crate::api::handlers::analytics::full,
        crate::api::handlers::pricing::list_quotes,
        crate::api::handlers::pricing::create_quote,
        crate::api::handlers::pricing::sync_catalog,
        crate::api::handlers::optimizations::list_suggestions,
        crate::api::handlers::optimizations::summary,
        crate::api::handlers::projects::create_project,
        crate::api::handlers::projects::list_projects,
        crate::api::handlers::projects::current_project,
        crate::api::handlers::projects::update_project,
    ),
    components(schemas(
        EventInput,
        EventBatchRequest,
        EventBatchResponse,
        AcceptedEvent,
        AcceptedStatus,
        RejectedEvent,
        RejectKind,
        EventResponse,
        AnalyticsOverview,
        AgentStats,
        ModelStats,
        TimeSeriesPoint,
        AnalyticsResponse,
        BucketWidth,
        QuoteResponse,
        QuoteCreateRequest,
        QuoteOrigin,
        SyncReport,
        Suggestion,
        SuggestionType,
        Priority,
        SavingsSummary,
        TypeBreakdown,
        ProjectCreate,
        ProjectUpdate,
        ProjectResponse,
        ProjectCreatedResponse,
        HealthResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/events/batch"));
        assert!(doc.paths.paths.contains_key("/v1/analytics/overview"));
    }
}
