//! Database repository for projects and API keys.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::Repository,
        models::projects::{ApiKey, Project, ProjectCreateDBRequest, ProjectDBResponse, ProjectFilter, ProjectUpdateDBRequest},
    },
    types::{ApiKeyId, ProjectId},
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Projects<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Projects<'c> {
    /// Create a new Projects repository instance
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Resolve an API-key secret to its owning project.
    ///
    /// This is the tenant-isolation entry point: only non-revoked keys of
    /// active projects resolve.
    #[instrument(skip(self, secret), err)]
    pub async fn find_by_api_key(&mut self, secret: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.is_active, p.created_at, p.updated_at
            FROM projects p
            JOIN api_keys k ON k.project_id = p.id
            WHERE k.secret = ?1 AND k.revoked_at IS NULL AND p.is_active = 1
            "#,
        )
        .bind(secret)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(project)
    }

    /// Issue a new API key for a project
    #[instrument(skip(self, secret), fields(project_id = %project_id), err)]
    pub async fn create_api_key(&mut self, project_id: ProjectId, secret: &str) -> Result<ApiKey> {
        let id: ApiKeyId = Uuid::new_v4();
        let now = Utc::now();

        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (id, project_id, secret, created_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4, NULL)
            RETURNING id, project_id, secret, created_at, revoked_at
            "#,
        )
        .bind(id)
        .bind(project_id)
        .bind(secret)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(key)
    }
}

#[async_trait::async_trait]
impl Repository for Projects<'_> {
    type CreateRequest = ProjectCreateDBRequest;
    type UpdateRequest = ProjectUpdateDBRequest;
    type Response = ProjectDBResponse;
    type Id = ProjectId;
    type Filter = ProjectFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: ProjectId = Uuid::new_v4();
        let now = Utc::now();

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            RETURNING id, name, description, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, name, description, is_active, created_at, updated_at FROM projects WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = if filter.include_inactive {
            "SELECT id, name, description, is_active, created_at, updated_at FROM projects ORDER BY created_at ASC"
        } else {
            "SELECT id, name, description, is_active, created_at, updated_at FROM projects WHERE is_active = 1 ORDER BY created_at ASC"
        };

        let projects = sqlx::query_as::<_, Project>(sql).fetch_all(&mut *self.db).await?;

        Ok(projects)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                is_active = COALESCE(?4, is_active),
                updated_at = ?5
            WHERE id = ?1
            RETURNING id, name, description, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(project)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn api_keys_resolve_only_for_active_projects(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Projects::new(&mut conn);

        let project = repo
            .create(&ProjectCreateDBRequest {
                name: "assistant".to_string(),
                description: Some("prod".to_string()),
            })
            .await
            .unwrap();
        repo.create_api_key(project.id, "ac-secret").await.unwrap();

        let resolved = repo.find_by_api_key("ac-secret").await.unwrap().unwrap();
        assert_eq!(resolved.id, project.id);
        assert!(repo.find_by_api_key("ac-wrong").await.unwrap().is_none());

        // Deactivating the project cuts off its keys.
        repo.update(
            project.id,
            &ProjectUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.find_by_api_key("ac-secret").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn listing_filters_inactive_projects(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Projects::new(&mut conn);

        let active = repo
            .create(&ProjectCreateDBRequest {
                name: "active".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let inactive = repo
            .create(&ProjectCreateDBRequest {
                name: "inactive".to_string(),
                description: None,
            })
            .await
            .unwrap();
        repo.update(
            inactive.id,
            &ProjectUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let visible = repo.list(&ProjectFilter { include_inactive: false }).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, active.id);

        let all = repo.list(&ProjectFilter { include_inactive: true }).await.unwrap();
        assert_eq!(all.len(), 2);

        assert!(repo.delete(inactive.id).await.unwrap());
        assert!(!repo.delete(inactive.id).await.unwrap());
        assert!(repo.get_by_id(inactive.id).await.unwrap().is_none());
    }
}
