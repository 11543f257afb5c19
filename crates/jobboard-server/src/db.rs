//! Database pool and audit store construction

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::audit::{AuditResult, MemoryAuditStore, PgAuditStore, SharedAuditStore};
use crate::config::{AuditBackend, Config, DatabaseConfig};

pub async fn create_pool(config: &DatabaseConfig) -> AuditResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Build the configured audit store. The postgres backend is migrated before use.
pub async fn connect_store(config: &Config) -> AuditResult<SharedAuditStore> {
    match config.audit.store {
        AuditBackend::Postgres => {
            let store = PgAuditStore::new(create_pool(&config.database).await?);
            store.migrate().await?;
            info!("Database migrations completed");
            Ok(Arc::new(store))
        },
        AuditBackend::Memory => {
            info!("Using in-memory audit store; records are lost on restart");
            Ok(Arc::new(MemoryAuditStore::new()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let mut config = Config::default();
        config.audit.store = AuditBackend::Memory;
        config.database.url = "postgresql://unreachable.invalid/none".to_string();

        let store = connect_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
