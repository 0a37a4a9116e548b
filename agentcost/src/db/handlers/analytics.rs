//! The single aggregation query shape behind every analytics report.
//!
//! Overview, per-agent, per-model, per-agent×model and time-series
//! statistics are all the same SELECT over the events table with a varying
//! GROUP BY dimension. Computing every report through this one path is what
//! guarantees cross-report consistency: the sum of per-model totals equals
//! the overview total for the same window because both are the same SQL
//! aggregates over the same half-open range.

use crate::{
    db::{
        errors::Result,
        models::analytics::{GroupBy, StatLine, Window},
    },
    types::ProjectId,
};
use sqlx::SqliteConnection;
use tracing::instrument;

/// Run the aggregation query for one grouping dimension.
///
/// The window is half-open `[start, end)` so adjacent windows and buckets
/// never double-count boundary events. Aggregation is pushed down to the
/// storage engine; events are never loaded into memory.
#[instrument(skip(db), fields(project_id = %project_id), err)]
pub async fn aggregate(
    db: &mut SqliteConnection,
    project_id: ProjectId,
    window: &Window,
    group_by: GroupBy,
) -> Result<Vec<StatLine>> {
    let (key_a, key_b) = match group_by {
        GroupBy::None => ("NULL", "NULL"),
        GroupBy::Agent => ("agent_name", "NULL"),
        GroupBy::Model => ("model_name", "NULL"),
        GroupBy::AgentModel => ("agent_name", "model_name"),
        GroupBy::TimeBucket(width) => (width.bucket_expr(), "NULL"),
    };

    let mut sql = format!(
        r#"
        SELECT {key_a} AS key_a,
               {key_b} AS key_b,
               COUNT(*) AS total_calls,
               COALESCE(SUM(success), 0) AS successful_calls,
               COALESCE(SUM(input_tokens), 0) AS input_tokens,
               COALESCE(SUM(output_tokens), 0) AS output_tokens,
               SUM(cost_nanos) AS cost_nanos,
               AVG(latency_ms) AS avg_latency_ms
        FROM events
        WHERE project_id = ?1 AND timestamp >= ?2 AND timestamp < ?3
        "#
    );

    match group_by {
        GroupBy::None => {}
        GroupBy::TimeBucket(_) => {
            sql.push_str(" GROUP BY key_a ORDER BY key_a ASC");
        }
        GroupBy::Agent | GroupBy::Model | GroupBy::AgentModel => {
            sql.push_str(" GROUP BY key_a, key_b ORDER BY COALESCE(SUM(cost_nanos), 0) DESC, key_a ASC");
        }
    }

    let lines = sqlx::query_as::<_, StatLine>(&sql)
        .bind(project_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&mut *db)
        .await?;

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Events, Projects, Repository};
    use crate::db::models::analytics::BucketWidth;
    use crate::db::models::events::EventInsertDBRequest;
    use crate::db::models::projects::ProjectCreateDBRequest;
    use chrono::{TimeZone, Utc};
    use sqlx::SqlitePool;
    use uuid::Uuid;

    async fn seed(pool: &SqlitePool) -> crate::types::ProjectId {
        let mut conn = pool.acquire().await.unwrap();
        let project = Projects::new(&mut conn)
            .create(&ProjectCreateDBRequest {
                name: "agg-test".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let mut events = Events::new(&mut conn);
        let specs: [(&str, &str, i64, i64, bool, i64, u32); 4] = [
            ("a", "gpt-4", 100, 50, true, 6_000_000, 10),
            ("a", "gpt-4", 200, 0, false, 6_000_000, 11),
            ("a", "gpt-3.5-turbo", 500, 500, true, 1_750_000, 11),
            ("b", "gpt-3.5-turbo", 100, 100, true, 350_000, 12),
        ];
        for (i, (agent, model, input, output, success, nanos, hour)) in specs.into_iter().enumerate() {
            events
                .insert(&EventInsertDBRequest {
                    id: Uuid::new_v4(),
                    project_id: project.id,
                    agent_name: agent.to_string(),
                    model_name: model.to_string(),
                    input_tokens: input,
                    output_tokens: output,
                    latency_ms: 100 * (i as i64 + 1),
                    success,
                    error: None,
                    timestamp: Utc.with_ymd_and_hms(2025, 6, 1, hour, 30, 0).unwrap(),
                    cost_nanos: Some(nanos),
                    idempotency_key: format!("evt-{i}"),
                    metadata: None,
                })
                .await
                .unwrap();
        }
        project.id
    }

    fn window() -> Window {
        Window {
            start: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn every_grouping_reconciles_to_the_same_totals(pool: SqlitePool) {
        let project_id = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let overview = aggregate(&mut conn, project_id, &window(), GroupBy::None).await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].total_calls, 4);
        assert_eq!(overview[0].successful_calls, 3);
        assert_eq!(overview[0].cost_nanos, Some(14_100_000));

        for group_by in [
            GroupBy::Agent,
            GroupBy::Model,
            GroupBy::AgentModel,
            GroupBy::TimeBucket(BucketWidth::Hour),
        ] {
            let lines = aggregate(&mut conn, project_id, &window(), group_by).await.unwrap();
            let calls: i64 = lines.iter().map(|l| l.total_calls).sum();
            let nanos: i64 = lines.iter().map(|l| l.cost_nanos_or_zero()).sum();
            assert_eq!(calls, 4, "{group_by:?}");
            assert_eq!(nanos, 14_100_000, "{group_by:?}");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn agent_model_grouping_carries_both_keys(pool: SqlitePool) {
        let project_id = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let lines = aggregate(&mut conn, project_id, &window(), GroupBy::AgentModel).await.unwrap();
        assert_eq!(lines.len(), 3);
        // Largest spend first
        assert_eq!(lines[0].key_a.as_deref(), Some("a"));
        assert_eq!(lines[0].key_b.as_deref(), Some("gpt-4"));
        assert_eq!(lines[0].total_calls, 2);

        let b_line = lines
            .iter()
            .find(|l| l.key_a.as_deref() == Some("b"))
            .expect("agent b line");
        assert_eq!(b_line.key_b.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(b_line.cost_nanos, Some(350_000));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn hour_buckets_split_at_hour_boundaries(pool: SqlitePool) {
        let project_id = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let lines = aggregate(&mut conn, project_id, &window(), GroupBy::TimeBucket(BucketWidth::Hour))
            .await
            .unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].key_a.as_deref(), Some("2025-06-01T10:00:00Z"));
        assert_eq!(lines[0].total_calls, 1);
        assert_eq!(lines[1].key_a.as_deref(), Some("2025-06-01T11:00:00Z"));
        assert_eq!(lines[1].total_calls, 2);
        assert_eq!(lines[2].key_a.as_deref(), Some("2025-06-01T12:00:00Z"));
    }
}
