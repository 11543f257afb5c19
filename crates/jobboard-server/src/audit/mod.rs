//! Admin action audit trail
//!
//! Every state-changing request made by an admin-like principal is recorded
//! as an [`AuditRecord`]. The pieces:
//!
//! - [`classify`] maps method and path to an [`AuditAction`]; unmatched
//!   requests are not recorded
//! - [`sanitize_body`] redacts credentials from the stored request body
//! - [`AuditLayer`] wires both into the request pipeline and writes records
//!   in detached tasks, so a slow or failing store never affects a response
//! - [`AuditStore`] persists records and backs the admin audit API
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use jobboard_server::audit::{AdminRoles, AuditLayer, MemoryAuditStore};
//!
//! let app: Router = Router::new()
//!     .layer(AuditLayer::new(Arc::new(MemoryAuditStore::new()), AdminRoles::default()));
//! ```
//!
//! The layer reads the [`Principal`](crate::auth::Principal) extension, so it
//! must run after authentication.

mod classify;
mod exchange;
mod middleware;
mod models;
mod roles;
mod sanitize;
pub mod store;


pub use classify::classify;
pub use exchange::{ExchangeAudit, ExchangeDetails, FALLBACK_ERROR_MESSAGE};
pub use middleware::{AuditLayer, AuditMiddleware, MAX_ERROR_BODY_BYTES, MAX_REQUEST_BODY_BYTES};
pub use models::{
    ActionCount, AdminActivity, AuditAction, AuditPage, AuditQuery, AuditRecord, AuditSortField,
    AuditStats, NewAuditRecord, Pagination, SortOrder, DEFAULT_AUDIT_PAGE_LIMIT,
    MAX_AUDIT_PAGE_LIMIT, retention_cutoff,
};
pub use roles::{AdminRoles, DEFAULT_ADMIN_ROLES};
pub use sanitize::{sanitize_body, REDACTION_MARKER, SENSITIVE_FIELDS};
pub use store::{
    AuditError, AuditResult, AuditStore, MemoryAuditStore, PgAuditStore, SharedAuditStore,
};
