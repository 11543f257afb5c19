pub mod audit_logs;
pub mod response;

use axum::{
    extract::{FromRef, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use crate::audit::{AdminRoles, AuditLayer, SharedAuditStore};
use crate::auth::{authenticate, Authenticator};
use crate::config::Config;
use crate::middleware;

/// State shared by all handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: SharedAuditStore,
    pub roles: AdminRoles,
    pub auth: Arc<Authenticator>,
    /// Default age for `DELETE /api/audit-logs/cleanup`
    pub retention_days: u32,
}

impl AppState {
    pub fn new(store: SharedAuditStore, config: &Config) -> Self {
        Self {
            store,
            roles: AdminRoles::new(config.audit.admin_roles.iter().cloned()),
            auth: Arc::new(Authenticator::new(
                &config.auth.jwt_secret,
                config.auth.token_ttl_hours,
            )),
            retention_days: config.audit.retention_days,
        }
    }
}

/// Health and audit-log routes without the middleware stack
///
/// Only this service's own routes are here. The job board's business routes
/// (jobs, applications, users) belong to the embedding application, which
/// merges them in before calling [`with_middleware`].
pub fn router(state: AppState) -> Router {
    let audit_logs = Router::new()
        .route("/", get(audit_logs::list_audit_logs))
        .route("/stats", get(audit_logs::audit_stats))
        .route("/actions", get(audit_logs::audit_actions))
        .route("/cleanup", delete(audit_logs::cleanup_audit_logs));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/audit-logs", audit_logs)
        .with_state(state)
}

/// This service's routes plus tracing, CORS, authentication and auditing
///
/// With no business routes merged in, admin mutations reach the 404 fallback
/// and are still recorded, with status 404.
pub fn create_app(state: AppState, config: &Config) -> Router {
    with_middleware(router(state.clone()), &state, config)
}

/// Wrap `app` in the middleware stack
///
/// The audit layer sees every route in `app`, so callers merge their business
/// routes first:
///
/// ```no_run
/// # use axum::Router;
/// # use jobboard_server::{api::{self, AppState}, config::Config};
/// # fn build(state: AppState, config: &Config, create_job: axum::routing::MethodRouter) -> Router {
/// let jobs = Router::new().route("/api/jobs", create_job);
/// api::with_middleware(api::router(state.clone()).merge(jobs), &state, config)
/// # }
/// ```
pub fn with_middleware(app: Router, state: &AppState, config: &Config) -> Router {
    // Layers run outermost-last: tracing, CORS, authentication, then auditing.
    let app = if config.audit.enabled {
        app.layer(AuditLayer::new(state.store.clone(), state.roles.clone()))
    } else {
        info!("Admin audit trail disabled (AUDIT_ENABLED=false)");
        app
    };

    app.layer(from_fn_with_state(state.auth.clone(), authenticate))
        .layer(middleware::cors_layer(&config.cors))
        .layer(middleware::tracing_layer())
}

/// Bind and serve until a shutdown signal arrives
pub async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let app = create_app(state, config);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

async fn health_check(State(store): State<SharedAuditStore>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "store": store.backend(),
    }))
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Leave pending audit writes a moment to land.
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
