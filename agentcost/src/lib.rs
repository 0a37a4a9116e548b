//! # agentcost: Cost Tracking and Analytics for LLM Agents
//!
//! `agentcost` is a self-hostable backend that tracks what LLM-powered
//! agents actually spend. SDKs instrumenting agent/model calls submit
//! batched usage events; the service prices each event against a
//! time-versioned model pricing table, stores it durably, and serves
//! aggregated analytics and cost-optimization suggestions back to project
//! owners.
//!
//! ## Overview
//!
//! Teams running agents across several models and providers rarely know
//! which agent, model, or prompt pattern their bill comes from. This crate
//! answers that with three cooperating pieces: an ingestion pipeline that
//! prices events deterministically at event time, an aggregation engine
//! whose report shapes are all projections of one query (so totals always
//! reconcile), and an optimization analyzer that turns the aggregates into
//! ranked, savings-estimated suggestions.
//!
//! ### Request Flow
//!
//! SDK requests carry a project API key (`Authorization: Bearer ac-...`).
//! The authentication extractor resolves the key to a project - the tenant
//! boundary every read and write is scoped by; project ids appearing in
//! payloads are never consulted. Batch submissions are validated per event (one bad
//! event never fails a batch), priced against an immutable in-memory
//! pricing snapshot at each event's reported timestamp, and inserted in one
//! transaction with idempotency-key deduplication handled by a storage
//! unique constraint.
//!
//! Operator requests (project provisioning, pricing overrides, catalog
//! sync) authenticate with a configured operator token instead.
//!
//! ### Core Components
//!
//! - The **API layer** ([`api`]) exposes events, analytics, pricing,
//!   optimization and project endpoints under `/v1/*`, documented via
//!   OpenAPI at `/docs`.
//! - The **authentication layer** ([`auth`]) resolves API keys and the
//!   operator token to typed extractors.
//! - The **database layer** ([`db`]) uses the repository pattern over SQLx
//!   with SQLite; costs are stored as integer nano-USD so aggregation is
//!   exact.
//! - The **pricing layer** ([`pricing`]) keeps every quote in an
//!   [`arc_swap`]-guarded snapshot, rebuilt wholesale on each write, and
//!   syncs a baseline catalog without clobbering operator overrides.
//! - The **optimizer** ([`optimizer`]) runs a polymorphic rule set over
//!   per-agent×model aggregates and ranks the results by estimated savings.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use agentcost::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = agentcost::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     agentcost::telemetry::init_telemetry();
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod optimizer;
pub mod pricing;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;

use crate::openapi::ApiDoc;
use crate::pricing::{PricingTable, catalog};
use axum::{
    Router,
    routing::{get, patch, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub pricing: Arc<PricingTable>,
}

/// Get the agentcost database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the full application router over an [`AppState`].
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::handlers::health))
        // Events
        .route("/events/batch", post(api::handlers::events::ingest_batch))
        .route("/events", get(api::handlers::events::list_events))
        // Analytics
        .route("/analytics/overview", get(api::handlers::analytics::overview))
        .route("/analytics/agents", get(api::handlers::analytics::agents))
        .route("/analytics/models", get(api::handlers::analytics::models))
        .route("/analytics/timeseries", get(api::handlers::analytics::timeseries))
        .route("/analytics/full", get(api::handlers::analytics::full))
        // Pricing
        .route("/pricing/models", get(api::handlers::pricing::list_quotes))
        .route("/pricing/models", post(api::handlers::pricing::create_quote))
        .route("/pricing/sync", post(api::handlers::pricing::sync_catalog))
        // Optimizations
        .route("/optimizations", get(api::handlers::optimizations::list_suggestions))
        .route("/optimizations/summary", get(api::handlers::optimizations::summary))
        // Projects
        .route("/projects", post(api::handlers::projects::create_project))
        .route("/projects", get(api::handlers::projects::list_projects))
        .route("/projects/current", get(api::handlers::projects::current_project))
        .route("/projects/{id}", patch(api::handlers::projects::update_project));

    Router::new()
        .nest("/v1", api_routes)
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(CorsLayer::permissive())
}

/// The assembled application: a bound listener plus the router.
pub struct Application {
    router: Router,
    listener: TcpListener,
}

impl Application {
    /// Connect to the database, run migrations, optionally sync the pricing
    /// catalog, load the pricing snapshot, and bind the server socket.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database.path, config.database.max_connections).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Like [`new`](Self::new) but over an existing pool (used by tests).
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        if config.pricing.sync_on_startup {
            let entries = match &config.pricing.catalog_url {
                Some(url) => catalog::fetch_or_builtin(url).await,
                None => catalog::builtin().to_vec(),
            };
            pricing::sync_defaults(&pool, &entries).await?;
        }

        let pricing_table = Arc::new(PricingTable::empty());
        pricing_table.reload(&pool).await?;

        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        info!("listening on {}", listener.local_addr()?);

        let state = AppState {
            db: pool,
            config,
            pricing: pricing_table,
        };

        Ok(Self {
            router: build_router(state),
            listener,
        })
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
