//! Authentication layer.
//!
//! Two credential classes exist:
//!
//! - **Project API keys** (`Authorization: Bearer ac-...`): resolve to a
//!   [`CurrentProject`], the tenant boundary every SDK-facing handler is
//!   scoped by. The project id used for reads and writes comes exclusively
//!   from this extractor - never from request payloads.
//! - **The operator token** (`Authorization: Bearer <admin_token>`): guards
//!   process-wide surfaces (project provisioning, pricing mutation) via the
//!   [`OperatorAccess`] extractor.

use crate::{
    AppState,
    db::{handlers::Projects, models::projects::Project},
    errors::{Error, Result},
    types::{ProjectId, abbrev_uuid},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use rand::Rng;
use tracing::{debug, instrument};

/// Prefix for generated project API keys
const API_KEY_PREFIX: &str = "ac-";

/// Generate a new project API key: `ac-` followed by 48 hex characters.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 24] = rng.r#gen();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{API_KEY_PREFIX}{hex}")
}

/// Extract the bearer token from an Authorization header, if present.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// The authenticated project for this request.
#[derive(Debug, Clone)]
pub struct CurrentProject {
    pub id: ProjectId,
    pub name: String,
}

impl From<Project> for CurrentProject {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
        }
    }
}

impl FromRequestParts<AppState> for CurrentProject {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthenticated {
            message: Some("Missing API key".to_string()),
        })?;

        let mut conn = state.db.acquire().await?;
        let project = Projects::new(&mut conn)
            .find_by_api_key(token)
            .await?
            .ok_or(Error::Unauthenticated {
                message: Some("Invalid or revoked API key".to_string()),
            })?;

        debug!(project = %abbrev_uuid(&project.id), "authenticated project request");
        Ok(project.into())
    }
}

/// Marker extractor for operator-only endpoints.
#[derive(Debug, Clone, Copy)]
pub struct OperatorAccess;

impl FromRequestParts<AppState> for OperatorAccess {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthenticated {
            message: Some("Missing operator token".to_string()),
        })?;

        let expected = state.config.admin_token.as_deref().ok_or(Error::Unauthenticated {
            message: Some("Operator token is not configured".to_string()),
        })?;

        if token != expected {
            return Err(Error::Unauthenticated {
                message: Some("Invalid operator token".to_string()),
            });
        }

        Ok(OperatorAccess)
    }
}
