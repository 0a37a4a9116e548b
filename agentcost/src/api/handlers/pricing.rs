//! Pricing table endpoints.
//!
//! Reads are open to any authenticated project. Mutation (operator
//! overrides, catalog sync) requires the operator token, rebuilds the
//! in-memory snapshot after commit, and never leaves overlapping quote
//! ranges behind.

use crate::{
    AppState,
    api::models::pricing::{ListQuotesQuery, QuoteCreateRequest, QuoteResponse},
    auth::{CurrentProject, OperatorAccess},
    db::{
        handlers::PriceQuotes,
        models::pricing::{QuoteCreateDBRequest, QuoteOrigin},
    },
    errors::{Error, Result},
    pricing::{self, SyncReport, catalog},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

/// List price quotes
#[utoipa::path(
    get,
    path = "/v1/pricing/models",
    tag = "pricing",
    params(ListQuotesQuery),
    responses(
        (status = 200, description = "Price quotes (open quotes by default)", body = [QuoteResponse]),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn list_quotes(
    State(state): State<AppState>,
    _project: CurrentProject,
    Query(query): Query<ListQuotesQuery>,
) -> Result<Json<Vec<QuoteResponse>>> {
    let mut conn = state.db.acquire().await?;
    let mut repo = PriceQuotes::new(&mut conn);

    let quotes = match &query.model {
        Some(model) if query.history.unwrap_or(false) => repo.list_for_model(model).await?,
        Some(model) => repo.open_quote(model).await?.into_iter().collect(),
        None => repo.list_open().await?,
    };

    Ok(Json(quotes.into_iter().map(QuoteResponse::from).collect()))
}

/// Set a model's price (operator override)
#[utoipa::path(
    post,
    path = "/v1/pricing/models",
    tag = "pricing",
    request_body = QuoteCreateRequest,
    responses(
        (status = 201, description = "Quote recorded; previous open quote closed at the new valid_from", body = QuoteResponse),
        (status = 400, description = "Negative price or out-of-order valid_from"),
        (status = 401, description = "Missing or invalid operator token"),
    )
)]
#[instrument(skip(state, request), fields(model = %request.model_name))]
pub async fn create_quote(
    State(state): State<AppState>,
    _operator: OperatorAccess,
    Json(request): Json<QuoteCreateRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>)> {
    if request.model_name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "model_name is required".to_string(),
        });
    }
    if request.input_price_per_token < Decimal::ZERO || request.output_price_per_token < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "prices must be non-negative".to_string(),
        });
    }

    let valid_from = request.valid_from.unwrap_or_else(Utc::now);

    // Close-and-replace atomically so concurrent readers see either the old
    // or the new quote, never an overlap.
    let mut tx = state.db.begin().await?;
    let mut repo = PriceQuotes::new(&mut tx);

    if let Some(open) = repo.open_quote(&request.model_name).await? {
        if open.valid_from >= valid_from {
            return Err(Error::BadRequest {
                message: format!(
                    "valid_from {valid_from} must be after the current quote's valid_from {}",
                    open.valid_from
                ),
            });
        }
        repo.close(open.id, valid_from).await?;
    }

    let quote = repo
        .insert(&QuoteCreateDBRequest {
            model_name: request.model_name,
            provider: request.provider,
            input_price_per_token: request.input_price_per_token,
            output_price_per_token: request.output_price_per_token,
            currency: "USD".to_string(),
            origin: QuoteOrigin::Override,
            valid_from,
        })
        .await?;

    tx.commit().await?;
    state.pricing.reload(&state.db).await?;

    Ok((StatusCode::CREATED, Json(quote.into())))
}

/// Sync the baseline pricing catalog
#[utoipa::path(
    post,
    path = "/v1/pricing/sync",
    tag = "pricing",
    responses(
        (status = 200, description = "Catalog synced; operator overrides preserved", body = SyncReport),
        (status = 401, description = "Missing or invalid operator token"),
    )
)]
pub async fn sync_catalog(State(state): State<AppState>, _operator: OperatorAccess) -> Result<Json<SyncReport>> {
    let entries = match &state.config.pricing.catalog_url {
        Some(url) => catalog::fetch_or_builtin(url).await,
        None => catalog::builtin().to_vec(),
    };

    let report = pricing::sync_defaults(&state.db, &entries).await?;
    state.pricing.reload(&state.db).await?;

    Ok(Json(report))
}
