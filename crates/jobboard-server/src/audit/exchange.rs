//! Per-request audit context
//!
//! An [`ExchangeAudit`] is created by the middleware for every qualifying
//! request. Whichever completion path runs first records the outcome and
//! schedules the write; later calls only hand the body back.

use axum::http::StatusCode;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::models::{AuditAction, NewAuditRecord};
use super::sanitize::is_truthy;
use super::store::SharedAuditStore;

/// Message stored when a failed response carries no usable error text
pub const FALLBACK_ERROR_MESSAGE: &str = "Error occurred";

/// Request-side facts captured before the handler runs
#[derive(Debug, Clone)]
pub struct ExchangeDetails {
    pub admin_id: String,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_role: String,
    /// Display name used in log lines
    pub actor: String,
    pub action: AuditAction,
    pub method: String,
    pub endpoint: String,
    pub source_address: String,
    pub user_agent: String,
    pub request_payload: Option<JsonValue>,
}

pub struct ExchangeAudit {
    store: SharedAuditStore,
    details: ExchangeDetails,
    logged: AtomicBool,
}

impl ExchangeAudit {
    pub fn new(store: SharedAuditStore, details: ExchangeDetails) -> Self {
        debug!(
            method = %details.method,
            endpoint = %details.endpoint,
            actor = %details.actor,
            action = %details.action,
            "Audit tracking"
        );

        Self {
            store,
            details,
            logged: AtomicBool::new(false),
        }
    }

    pub fn details(&self) -> &ExchangeDetails {
        &self.details
    }

    /// Whether a write has already been scheduled for this exchange
    pub fn is_logged(&self) -> bool {
        self.logged.load(Ordering::Acquire)
    }

    /// Completion for a structured (JSON) response body
    pub fn complete_json(&self, status: StatusCode, body: &JsonValue) -> Option<JoinHandle<()>> {
        let error_message = status_is_error(status).then(|| json_error_message(body));
        self.finish(status, error_message)
    }

    /// Completion for any other response body
    pub fn complete_raw(&self, status: StatusCode, body: &[u8]) -> Option<JoinHandle<()>> {
        let error_message = status_is_error(status).then(|| raw_error_message(body));
        self.finish(status, error_message)
    }

    /// Schedule the write unless one was already scheduled
    fn finish(&self, status: StatusCode, error_message: Option<String>) -> Option<JoinHandle<()>> {
        if self.logged.swap(true, Ordering::AcqRel) {
            return None;
        }

        let details = self.details.clone();
        let actor = details.actor;
        let record = NewAuditRecord {
            admin_id: details.admin_id,
            admin_name: details.admin_name,
            admin_email: details.admin_email,
            admin_role: details.admin_role,
            action: details.action,
            method: details.method,
            endpoint: details.endpoint,
            source_address: details.source_address,
            user_agent: details.user_agent,
            request_payload: details.request_payload,
            status_code: status.as_u16(),
            error_message,
        };
        let store = self.store.clone();

        Some(tokio::spawn(async move {
            let action = record.action;
            match store.append(record).await {
                Ok(stored) => {
                    info!(
                        audit_id = %stored.id,
                        action = %stored.action,
                        actor = %actor,
                        status = stored.status_code,
                        "Audit log created"
                    );
                },
                Err(e) => {
                    error!(
                        action = %action,
                        actor = %actor,
                        error = %e,
                        "Audit logging error"
                    );
                },
            }
        }))
    }
}

fn status_is_error(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// `message`, then `error`, then the fallback text
fn json_error_message(body: &JsonValue) -> String {
    ["message", "error"]
        .into_iter()
        .filter_map(|key| body.get(key))
        .find(|value| is_truthy(value))
        .map(|value| match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

fn raw_error_message(body: &[u8]) -> String {
    std::str::from_utf8(body)
        .map(str::to_string)
        .unwrap_or_else(|_| FALLBACK_ERROR_MESSAGE.to_string())
}
