//! Jobboard Server Library
//!
//! HTTP service that keeps the admin action audit trail for the job board.
//!
//! # Overview
//!
//! - **Audit middleware**: every job, application and user change made by an
//!   admin-like principal becomes an immutable audit record, written off the
//!   request path
//! - **Audit API**: admins list, aggregate and purge records under
//!   `/api/audit-logs`
//! - **Authentication**: HS256 bearer tokens resolve the request principal
//! - **Configuration**: environment-based, see [`config::Config::load`]
//!
//! # Example
//!
//! ```no_run
//! use jobboard_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = db::connect_store(&config).await?;
//!     api::serve(api::AppState::new(store, &config), &config).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, ServerResult};
