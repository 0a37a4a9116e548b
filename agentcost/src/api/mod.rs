//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Events** (`/v1/events/*`): Batch ingestion and recent-event listing
//! - **Analytics** (`/v1/analytics/*`): Overview, per-agent, per-model,
//!   time-series and combined reports
//! - **Pricing** (`/v1/pricing/*`): Quote listing, operator overrides,
//!   catalog sync
//! - **Optimizations** (`/v1/optimizations/*`): Suggestions and savings summary
//! - **Projects** (`/v1/projects/*`): Tenant provisioning (operator only)
//!
//! All endpoints are documented with OpenAPI annotations via `utoipa`;
//! the rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;
