//! Project provisioning (operator) and project self-inspection.

use crate::{
    AppState,
    api::models::projects::{ProjectCreate, ProjectCreatedResponse, ProjectResponse, ProjectUpdate},
    auth::{self, CurrentProject, OperatorAccess},
    db::{
        handlers::{Projects, Repository},
        models::projects::{ProjectCreateDBRequest, ProjectFilter, ProjectUpdateDBRequest},
    },
    errors::{Error, Result},
    types::ProjectId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{info, instrument};

/// Provision a new project with its first API key
#[utoipa::path(
    post,
    path = "/v1/projects",
    tag = "projects",
    request_body = ProjectCreate,
    responses(
        (status = 201, description = "Project created; the API key is returned exactly once", body = ProjectCreatedResponse),
        (status = 400, description = "Invalid project name"),
        (status = 401, description = "Missing or invalid operator token"),
    )
)]
#[instrument(skip(state, request))]
pub async fn create_project(
    State(state): State<AppState>,
    _operator: OperatorAccess,
    Json(request): Json<ProjectCreate>,
) -> Result<(StatusCode, Json<ProjectCreatedResponse>)> {
    if request.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "project name is required".to_string(),
        });
    }

    let secret = auth::generate_api_key();

    let mut tx = state.db.begin().await?;
    let mut repo = Projects::new(&mut tx);
    let project = repo
        .create(&ProjectCreateDBRequest {
            name: request.name,
            description: request.description,
        })
        .await?;
    repo.create_api_key(project.id, &secret).await?;
    tx.commit().await?;

    info!(project_id = %project.id, "provisioned project");

    Ok((
        StatusCode::CREATED,
        Json(ProjectCreatedResponse {
            project: project.into(),
            api_key: secret,
        }),
    ))
}

/// List all projects
#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "projects",
    responses(
        (status = 200, description = "All projects, including inactive ones", body = [ProjectResponse]),
        (status = 401, description = "Missing or invalid operator token"),
    )
)]
pub async fn list_projects(State(state): State<AppState>, _operator: OperatorAccess) -> Result<Json<Vec<ProjectResponse>>> {
    let mut conn = state.db.acquire().await?;
    let projects = Projects::new(&mut conn)
        .list(&ProjectFilter { include_inactive: true })
        .await?;

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// Update a project's name, description or active flag
#[utoipa::path(
    patch,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID (UUID)")),
    request_body = ProjectUpdate,
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 401, description = "Missing or invalid operator token"),
        (status = 404, description = "Project not found"),
    )
)]
#[instrument(skip(state, request), fields(project_id = %id))]
pub async fn update_project(
    State(state): State<AppState>,
    _operator: OperatorAccess,
    Path(id): Path<ProjectId>,
    Json(request): Json<ProjectUpdate>,
) -> Result<Json<ProjectResponse>> {
    let mut tx = state.db.begin().await?;
    let mut repo = Projects::new(&mut tx);
    let project = repo
        .update(
            id,
            &ProjectUpdateDBRequest {
                name: request.name,
                description: request.description,
                is_active: request.is_active,
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(project.into()))
}

/// The project behind the presented API key
#[utoipa::path(
    get,
    path = "/v1/projects/current",
    tag = "projects",
    responses(
        (status = 200, description = "The authenticated project", body = ProjectResponse),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
pub async fn current_project(State(state): State<AppState>, project: CurrentProject) -> Result<Json<ProjectResponse>> {
    let mut conn = state.db.acquire().await?;
    let project = Projects::new(&mut conn)
        .get_by_id(project.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Project".to_string(),
            id: project.id.to_string(),
        })?;

    Ok(Json(project.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_test_app, operator_header};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn provisioning_returns_a_working_api_key(pool: SqlitePool) {
        let server = create_test_app(pool, true).await;

        let (op_name, op_value) = operator_header();
        let response = server
            .post("/v1/projects")
            .add_header(op_name, op_value)
            .json(&json!({"name": "my-assistant", "description": "prod"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ProjectCreatedResponse = response.json();
        assert!(created.api_key.starts_with("ac-"));
        assert_eq!(created.project.name, "my-assistant");

        let (name, value) = auth_header(&created.api_key);
        let current: ProjectResponse = server.get("/v1/projects/current").add_header(name, value).await.json();
        assert_eq!(current.id, created.project.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn provisioning_requires_the_operator_token(pool: SqlitePool) {
        let server = create_test_app(pool, true).await;

        let response = server.post("/v1/projects").json(&json!({"name": "nope"})).await;
        response.assert_status_unauthorized();

        let response = server.get("/v1/projects").await;
        response.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn deactivating_a_project_revokes_its_keys(pool: SqlitePool) {
        let server = create_test_app(pool, true).await;

        let (op_name, op_value) = operator_header();
        let created: ProjectCreatedResponse = server
            .post("/v1/projects")
            .add_header(op_name.clone(), op_value.clone())
            .json(&json!({"name": "short-lived"}))
            .await
            .json();

        let updated: ProjectResponse = server
            .patch(&format!("/v1/projects/{}", created.project.id))
            .add_header(op_name.clone(), op_value.clone())
            .json(&json!({"is_active": false}))
            .await
            .json();
        assert!(!updated.is_active);

        let (name, value) = auth_header(&created.api_key);
        server
            .get("/v1/projects/current")
            .add_header(name, value)
            .await
            .assert_status_unauthorized();

        // Unknown project ids are a 404, not a silent no-op.
        server
            .patch(&format!("/v1/projects/{}", uuid::Uuid::new_v4()))
            .add_header(op_name, op_value)
            .json(&json!({"is_active": false}))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn blank_names_are_rejected(pool: SqlitePool) {
        let server = create_test_app(pool, true).await;

        let (op_name, op_value) = operator_header();
        let response = server
            .post("/v1/projects")
            .add_header(op_name, op_value)
            .json(&json!({"name": "   "}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
