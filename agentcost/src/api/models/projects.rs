//! Project provisioning API types.

use crate::db::models::projects::Project;
use crate::types::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Create project request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProjectCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Update project request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Deactivating a project cuts off all of its API keys
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Project response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            is_active: project.is_active,
            created_at: project.created_at,
        }
    }
}

/// Response for a newly provisioned project. The API key is returned
/// exactly once, here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectCreatedResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub api_key: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
