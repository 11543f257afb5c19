//! Persistence for audit records
//!
//! [`AuditStore`] is the append-only sink the middleware writes to, plus the
//! read and retention operations behind the admin audit API. Two backends are
//! provided: [`PgAuditStore`] for PostgreSQL and [`MemoryAuditStore`] for tests
//! and single-process development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use super::models::{AuditPage, AuditQuery, AuditRecord, AuditStats, NewAuditRecord};

mod memory;
mod postgres;

pub use memory::MemoryAuditStore;
pub use postgres::PgAuditStore;

/// Errors raised by audit stores
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Shared handle to a store
pub type SharedAuditStore = Arc<dyn AuditStore>;

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    /// Append a record. Records are never modified after this call.
    async fn append(&self, record: NewAuditRecord) -> AuditResult<AuditRecord>;

    /// Filtered, sorted, paginated listing
    async fn list(&self, query: AuditQuery) -> AuditResult<AuditPage>;

    /// Aggregate statistics; "recent" is measured back from `now`
    async fn stats(&self, now: DateTime<Utc>) -> AuditResult<AuditStats>;

    /// Distinct action labels in ascending order
    async fn distinct_actions(&self) -> AuditResult<Vec<String>>;

    /// Delete records created strictly before `cutoff`, returning how many were removed
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64>;
}
