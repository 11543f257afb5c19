//! Audit data models

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Default number of audit records per page
pub const DEFAULT_AUDIT_PAGE_LIMIT: u32 = 10;

/// Maximum number of audit records a single page may return
pub const MAX_AUDIT_PAGE_LIMIT: u32 = 100;

/// Window used for the "recent logs" statistic
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Number of admins reported in the activity ranking
pub const ACTIVE_ADMINS_LIMIT: usize = 5;

/// Placeholder stored when the client address or user agent is unknown
pub const UNKNOWN: &str = "Unknown";

/// Audit log record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Identifier of the acting admin
    pub admin_id: String,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    /// Role the admin held when acting
    pub admin_role: String,
    /// Action label, one of [`AuditAction::label`]
    pub action: String,
    pub method: String,
    /// Request path as seen by the server, including any mount prefix
    pub endpoint: String,
    pub source_address: String,
    pub user_agent: String,
    /// Sanitized copy of the request body
    pub request_payload: Option<JsonValue>,
    #[sqlx(try_from = "i32")]
    pub status_code: u16,
    /// Only set when `status_code >= 400`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a record; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub admin_id: String,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_role: String,
    pub action: AuditAction,
    pub method: String,
    pub endpoint: String,
    pub source_address: String,
    pub user_agent: String,
    pub request_payload: Option<JsonValue>,
    pub status_code: u16,
    pub error_message: Option<String>,
}

/// Closed taxonomy of admin actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "Create Job")]
    CreateJob,
    #[serde(rename = "Update Job")]
    UpdateJob,
    #[serde(rename = "Delete Job")]
    DeleteJob,
    #[serde(rename = "Seed Jobs")]
    SeedJobs,
    #[serde(rename = "Clear Seeded Jobs")]
    ClearSeededJobs,
    #[serde(rename = "Accept Application")]
    AcceptApplication,
    #[serde(rename = "Reject Application")]
    RejectApplication,
    #[serde(rename = "Update Application")]
    UpdateApplication,
    #[serde(rename = "Delete Application")]
    DeleteApplication,
    #[serde(rename = "Create User")]
    CreateUser,
    #[serde(rename = "Suspend User")]
    SuspendUser,
    #[serde(rename = "Activate User")]
    ActivateUser,
    #[serde(rename = "Update User")]
    UpdateUser,
    #[serde(rename = "Delete User")]
    DeleteUser,
}

impl AuditAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateJob => "Create Job",
            Self::UpdateJob => "Update Job",
            Self::DeleteJob => "Delete Job",
            Self::SeedJobs => "Seed Jobs",
            Self::ClearSeededJobs => "Clear Seeded Jobs",
            Self::AcceptApplication => "Accept Application",
            Self::RejectApplication => "Reject Application",
            Self::UpdateApplication => "Update Application",
            Self::DeleteApplication => "Delete Application",
            Self::CreateUser => "Create User",
            Self::SuspendUser => "Suspend User",
            Self::ActivateUser => "Activate User",
            Self::UpdateUser => "Update User",
            Self::DeleteUser => "Delete User",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Column used to order a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSortField {
    #[default]
    CreatedAt,
    Action,
    StatusCode,
}

impl AuditSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Action => "action",
            Self::StatusCode => "status_code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters and paging for audit log listings
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub action: Option<AuditAction>,
    pub admin_id: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_by: AuditSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_AUDIT_PAGE_LIMIT
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            action: None,
            admin_id: None,
            start_date: None,
            end_date: None,
            sort_by: AuditSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl AuditQuery {
    /// Clamp paging values into their valid ranges
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_AUDIT_PAGE_LIMIT);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Whether a record passes the filters of this query
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(action) = self.action {
            if record.action != action.label() {
                return false;
            }
        }
        if let Some(ref admin_id) = self.admin_id {
            if &record.admin_id != admin_id {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if record.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if record.created_at > end {
                return false;
            }
        }
        true
    }
}

/// One page of audit records
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub logs: Vec<AuditRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(limit.max(1)));
        Self {
            current_page: page,
            total_pages,
            total_count,
            limit,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActivity {
    pub admin_id: String,
    /// Name and email from the admin's most recent record
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub action_count: u64,
}

/// Cutoff for purging records older than `days`, or `None` when it falls
/// outside the representable date range
pub fn retention_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(i64::from(days)).and_then(|age| now.checked_sub_signed(age))
}

/// Aggregate figures over the whole audit log
#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub total_logs: u64,
    /// Records created within [`RECENT_WINDOW_HOURS`] of the reference time
    pub recent_logs: u64,
    /// Counts per action, most frequent first
    pub action_breakdown: Vec<ActionCount>,
    /// Most active admins, at most [`ACTIVE_ADMINS_LIMIT`]
    pub active_admins: Vec<AdminActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_as_label() {
        let json = serde_json::to_string(&AuditAction::ClearSeededJobs).unwrap();
        assert_eq!(json, r#""Clear Seeded Jobs""#);

        let action: AuditAction = serde_json::from_str(r#""Accept Application""#).unwrap();
        assert_eq!(action, AuditAction::AcceptApplication);
        assert_eq!(action.to_string(), "Accept Application");
    }

    #[test]
    fn test_query_normalization() {
        let query = AuditQuery {
            page: 0,
            limit: 5_000,
            ..Default::default()
        }
        .normalized();

        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_AUDIT_PAGE_LIMIT);
        assert_eq!(query.offset(), 0);

        let query = AuditQuery {
            page: 3,
            limit: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(query.limit, 1);
        assert_eq!(query.offset(), 2);
    }

    #[test]
    fn test_pagination_flags() {
        let first = Pagination::new(1, 10, 25);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now, 90), Some(now - TimeDelta::days(90)));
        assert_eq!(retention_cutoff(now, 4_000_000_000), None);
        assert_eq!(retention_cutoff(now, u32::MAX), None);
    }

    #[test]
    fn test_query_deserializes_from_query_string_shape() {
        let query: AuditQuery = serde_json::from_value(serde_json::json!({
            "action": "Delete User",
            "sort_by": "status_code",
            "sort_order": "asc",
        }))
        .unwrap();

        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_AUDIT_PAGE_LIMIT);
        assert_eq!(query.action, Some(AuditAction::DeleteUser));
        assert_eq!(query.sort_by, AuditSortField::StatusCode);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }
}
