//! Database models for projects and their API-key credentials.

use crate::types::{ApiKeyId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database representation of a project (the tenant boundary)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new project
#[derive(Debug, Clone)]
pub struct ProjectCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Request to update an existing project
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Filter for listing projects
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectFilter {
    pub include_inactive: bool,
}

/// Database representation of a project API key
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub project_id: ProjectId,
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

pub type ProjectDBResponse = Project;
