//! In-process audit store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditResult, AuditStore};
use crate::audit::models::{
    ActionCount, AdminActivity, AuditPage, AuditQuery, AuditRecord, AuditSortField, AuditStats,
    NewAuditRecord, Pagination, SortOrder, ACTIVE_ADMINS_LIMIT, RECENT_WINDOW_HOURS,
};

/// Audit store that keeps records in memory. Records are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditStore {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in insertion order
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn compare(a: &AuditRecord, b: &AuditRecord, field: AuditSortField) -> Ordering {
    match field {
        AuditSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        AuditSortField::Action => a.action.cmp(&b.action),
        AuditSortField::StatusCode => a.status_code.cmp(&b.status_code),
    }
}

/// Sort `(key, count)` pairs by count descending, ties by key
fn ranked(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, record: NewAuditRecord) -> AuditResult<AuditRecord> {
        let stored = AuditRecord {
            id: Uuid::new_v4(),
            admin_id: record.admin_id,
            admin_name: record.admin_name,
            admin_email: record.admin_email,
            admin_role: record.admin_role,
            action: record.action.label().to_string(),
            method: record.method,
            endpoint: record.endpoint,
            source_address: record.source_address,
            user_agent: record.user_agent,
            request_payload: record.request_payload,
            status_code: record.status_code,
            error_message: record.error_message,
            created_at: Utc::now(),
        };

        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, query: AuditQuery) -> AuditResult<AuditPage> {
        let query = query.normalized();
        let records = self.records.read().await;

        let mut matching: Vec<AuditRecord> =
            records.iter().filter(|r| query.matches(r)).cloned().collect();
        drop(records);

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total_count = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let logs = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(AuditPage {
            logs,
            pagination: Pagination::new(query.page, query.limit, total_count),
        })
    }

    async fn stats(&self, now: DateTime<Utc>) -> AuditResult<AuditStats> {
        let records = self.records.read().await;
        let recent_since = now - Duration::hours(RECENT_WINDOW_HOURS);

        let mut by_action: HashMap<String, u64> = HashMap::new();
        let mut by_admin: HashMap<String, u64> = HashMap::new();
        // Insertion order, so the last write wins as the most recent identity.
        let mut identities: HashMap<&str, (Option<String>, Option<String>)> = HashMap::new();
        let mut recent_logs = 0;

        for record in records.iter() {
            *by_action.entry(record.action.clone()).or_default() += 1;
            *by_admin.entry(record.admin_id.clone()).or_default() += 1;
            identities.insert(
                &record.admin_id,
                (record.admin_name.clone(), record.admin_email.clone()),
            );
            if record.created_at >= recent_since {
                recent_logs += 1;
            }
        }

        Ok(AuditStats {
            total_logs: records.len() as u64,
            recent_logs,
            action_breakdown: ranked(by_action)
                .into_iter()
                .map(|(action, count)| ActionCount { action, count })
                .collect(),
            active_admins: ranked(by_admin)
                .into_iter()
                .take(ACTIVE_ADMINS_LIMIT)
                .map(|(admin_id, action_count)| {
                    let (admin_name, admin_email) =
                        identities.remove(admin_id.as_str()).unwrap_or_default();
                    AdminActivity {
                        admin_id,
                        admin_name,
                        admin_email,
                        action_count,
                    }
                })
                .collect(),
        })
    }

    async fn distinct_actions(&self) -> AuditResult<Vec<String>> {
        let records = self.records.read().await;
        let mut actions: Vec<String> = records.iter().map(|r| r.action.clone()).collect();
        actions.sort();
        actions.dedup();
        Ok(actions)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
