//! Jobboard Common Library
//!
//! Shared pieces used by every jobboard binary:
//!
//! - **Error Handling**: the [`JobboardError`] type and [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by `LOG_*` environment variables
//!
//! # Example
//!
//! ```no_run
//! use jobboard_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> jobboard_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{JobboardError, Result};
