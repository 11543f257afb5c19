//! PostgreSQL audit store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{AuditResult, AuditStore};
use crate::audit::models::{
    ActionCount, AdminActivity, AuditPage, AuditQuery, AuditRecord, AuditStats, NewAuditRecord,
    Pagination, ACTIVE_ADMINS_LIMIT, RECENT_WINDOW_HOURS,
};

const RECORD_COLUMNS: &str = "id, admin_id, admin_name, admin_email, admin_role, action, method, \
                              endpoint, source_address, user_agent, request_payload, status_code, \
                              error_message, created_at";

/// Audit store backed by the `audit_logs` table
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled migrations
    pub async fn migrate(&self) -> AuditResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Append the WHERE clause for `query`'s filters
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    builder.push(" WHERE TRUE");

    if let Some(action) = query.action {
        builder.push(" AND action = ").push_bind(action.label());
    }
    if let Some(ref admin_id) = query.admin_id {
        builder.push(" AND admin_id = ").push_bind(admin_id.clone());
    }
    if let Some(start) = query.start_date {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = query.end_date {
        builder.push(" AND created_at <= ").push_bind(end);
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl AuditStore for PgAuditStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, record: NewAuditRecord) -> AuditResult<AuditRecord> {
        let stored = sqlx::query_as::<_, AuditRecord>(&format!(
            r#"
            INSERT INTO audit_logs (
                id, admin_id, admin_name, admin_email, admin_role, action, method,
                endpoint, source_address, user_agent, request_payload, status_code,
                error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&record.admin_id)
        .bind(&record.admin_name)
        .bind(&record.admin_email)
        .bind(&record.admin_role)
        .bind(record.action.label())
        .bind(&record.method)
        .bind(&record.endpoint)
        .bind(&record.source_address)
        .bind(&record.user_agent)
        .bind(&record.request_payload)
        .bind(i32::from(record.status_code))
        .bind(&record.error_message)
        .fetch_one(&self.pool)
        .await?;

        debug!(audit_id = %stored.id, action = %stored.action, "Inserted audit record");

        Ok(stored)
    }

    async fn list(&self, query: AuditQuery) -> AuditResult<AuditPage> {
        let query = query.normalized();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {RECORD_COLUMNS} FROM audit_logs"));
        push_filters(&mut select, &query);
        // Sort column and direction come from closed enums, never from raw input.
        select
            .push(" ORDER BY ")
            .push(query.sort_by.column())
            .push(" ")
            .push(query.sort_order.keyword())
            .push(", id ")
            .push(query.sort_order.keyword())
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let logs = select
            .build_query_as::<AuditRecord>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = logs.len(), total, "Queried audit logs");

        Ok(AuditPage {
            logs,
            pagination: Pagination::new(query.page, query.limit, to_count(total)),
        })
    }

    async fn stats(&self, now: DateTime<Utc>) -> AuditResult<AuditStats> {
        let recent_since = now - Duration::hours(RECENT_WINDOW_HOURS);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.pool)
            .await?;

        let recent: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE created_at >= $1")
                .bind(recent_since)
                .fetch_one(&self.pool)
                .await?;

        let breakdown: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT action, COUNT(*) AS count
            FROM audit_logs
            GROUP BY action
            ORDER BY count DESC, action ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let admins: Vec<(String, Option<String>, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT
                admin_id,
                (ARRAY_AGG(admin_name ORDER BY created_at DESC))[1] AS admin_name,
                (ARRAY_AGG(admin_email ORDER BY created_at DESC))[1] AS admin_email,
                COUNT(*) AS action_count
            FROM audit_logs
            GROUP BY admin_id
            ORDER BY action_count DESC, admin_id ASC
            LIMIT $1
            "#,
        )
        .bind(ACTIVE_ADMINS_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(AuditStats {
            total_logs: to_count(total),
            recent_logs: to_count(recent),
            action_breakdown: breakdown
                .into_iter()
                .map(|(action, count)| ActionCount {
                    action,
                    count: to_count(count),
                })
                .collect(),
            active_admins: admins
                .into_iter()
                .map(|(admin_id, admin_name, admin_email, count)| AdminActivity {
                    admin_id,
                    admin_name,
                    admin_email,
                    action_count: to_count(count),
                })
                .collect(),
        })
    }

    async fn distinct_actions(&self) -> AuditResult<Vec<String>> {
        let actions: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT action FROM audit_logs ORDER BY action")
                .fetch_all(&self.pool)
                .await?;
        Ok(actions)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        debug!(cutoff = %cutoff, deleted = result.rows_affected(), "Purged audit logs");

        Ok(result.rows_affected())
    }
}
