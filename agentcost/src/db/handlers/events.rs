//! Database repository for the append-only usage event log.

use crate::{
    db::{
        errors::Result,
        models::events::{EventInsertDBRequest, EventRow, InsertOutcome, StoredEvent},
    },
    types::ProjectId,
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

const EVENT_COLUMNS: &str = "id, project_id, agent_name, model_name, input_tokens, output_tokens, latency_ms, success, error, timestamp, cost_nanos, idempotency_key, metadata, created_at";

pub struct Events<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Events<'c> {
    /// Create a new Events repository instance
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Insert one event, deduplicating on (project_id, idempotency_key).
    ///
    /// A conflicting key means a retry of an already-recorded submission:
    /// nothing is written and [`InsertOutcome::Duplicate`] is returned. The
    /// unique constraint makes this safe under concurrent duplicate
    /// submissions - exactly one of the racers stores the row.
    #[instrument(skip(self, request), fields(project_id = %request.project_id, agent = %request.agent_name), err)]
    pub async fn insert(&mut self, request: &EventInsertDBRequest) -> Result<InsertOutcome> {
        let metadata = request
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()
            .map_err(anyhow::Error::from)?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (id, project_id, agent_name, model_name, input_tokens,
                                output_tokens, latency_ms, success, error, timestamp,
                                cost_nanos, idempotency_key, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT (project_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(request.id)
        .bind(request.project_id)
        .bind(&request.agent_name)
        .bind(&request.model_name)
        .bind(request.input_tokens)
        .bind(request.output_tokens)
        .bind(request.latency_ms)
        .bind(request.success)
        .bind(&request.error)
        .bind(request.timestamp)
        .bind(request.cost_nanos)
        .bind(&request.idempotency_key)
        .bind(metadata)
        .bind(Utc::now())
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Stored)
        }
    }

    /// Fetch the stored event for an idempotency key within a project
    #[instrument(skip(self, idempotency_key), err)]
    pub async fn get_by_idempotency_key(
        &mut self,
        project_id: ProjectId,
        idempotency_key: &str,
    ) -> Result<Option<StoredEvent>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE project_id = ?1 AND idempotency_key = ?2"
        ))
        .bind(project_id)
        .bind(idempotency_key)
        .fetch_optional(&mut *self.db)
        .await?;

        row.map(StoredEvent::try_from).transpose().map_err(Into::into)
    }

    /// List a project's most recent events, newest first
    #[instrument(skip(self), err)]
    pub async fn list_recent(&mut self, project_id: ProjectId, limit: i64, offset: i64) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE project_id = ?1
            ORDER BY timestamp DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|r| StoredEvent::try_from(r).map_err(Into::into))
            .collect()
    }

    /// Count all events stored for a project
    #[instrument(skip(self), err)]
    pub async fn count(&mut self, project_id: ProjectId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE project_id = ?1")
            .bind(project_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Projects, Repository};
    use crate::db::models::projects::ProjectCreateDBRequest;
    use chrono::TimeZone;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    async fn test_project(pool: &SqlitePool) -> ProjectId {
        let mut conn = pool.acquire().await.unwrap();
        Projects::new(&mut conn)
            .create(&ProjectCreateDBRequest {
                name: "repo-test".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id
    }

    fn insert_request(project_id: ProjectId, key: &str) -> EventInsertDBRequest {
        EventInsertDBRequest {
            id: Uuid::new_v4(),
            project_id,
            agent_name: "agent".to_string(),
            model_name: "gpt-4".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            latency_ms: 800,
            success: true,
            error: None,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            cost_nanos: Some(6_000_000),
            idempotency_key: key.to_string(),
            metadata: Some(serde_json::json!({"run": 7})),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn duplicate_keys_store_exactly_one_row(pool: SqlitePool) {
        let project_id = test_project(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let first = repo.insert(&insert_request(project_id, "evt-1")).await.unwrap();
        assert_eq!(first, InsertOutcome::Stored);

        // Same key, different generated row id: must dedupe.
        let second = repo.insert(&insert_request(project_id, "evt-1")).await.unwrap();
        assert_eq!(second, InsertOutcome::Duplicate);

        assert_eq!(repo.count(project_id).await.unwrap(), 1);

        let stored = repo.get_by_idempotency_key(project_id, "evt-1").await.unwrap().unwrap();
        assert_eq!(stored.cost_nanos, Some(6_000_000));
        assert_eq!(stored.metadata.unwrap()["run"], 7);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn the_same_key_in_two_projects_is_two_events(pool: SqlitePool) {
        let project_a = test_project(&pool).await;
        let project_b = test_project(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        assert_eq!(repo.insert(&insert_request(project_a, "evt-1")).await.unwrap(), InsertOutcome::Stored);
        assert_eq!(repo.insert(&insert_request(project_b, "evt-1")).await.unwrap(), InsertOutcome::Stored);

        assert_eq!(repo.count(project_a).await.unwrap(), 1);
        assert_eq!(repo.count(project_b).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn listing_is_scoped_and_newest_first(pool: SqlitePool) {
        let project_id = test_project(&pool).await;
        let other = test_project(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let mut older = insert_request(project_id, "evt-old");
        older.timestamp = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        repo.insert(&older).await.unwrap();
        repo.insert(&insert_request(project_id, "evt-new")).await.unwrap();
        repo.insert(&insert_request(other, "evt-other")).await.unwrap();

        let events = repo.list_recent(project_id, 50, 0).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].idempotency_key, "evt-new");
        assert_eq!(events[1].idempotency_key, "evt-old");
    }
}
