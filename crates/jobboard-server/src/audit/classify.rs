//! Maps a request's method and path to an admin action label.
//!
//! Rules are checked in order and a category that matches the path but not the
//! method falls through to the next one. The order is load-bearing:
//! `/api/seed/jobs` also contains `/jobs`, so the seed exclusion in the job rule
//! is what lets `POST /api/seed/jobs` reach "Seed Jobs".

use axum::http::Method;

use super::models::AuditAction;

/// Classify a request, returning `None` when it should not be audited
pub fn classify(method: &Method, path: &str) -> Option<AuditAction> {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return None;
    }

    let path = path.to_ascii_lowercase();
    let is_update = matches!(*method, Method::PUT | Method::PATCH);

    if path.contains("/jobs") {
        if *method == Method::POST && !path.contains("/seed") {
            return Some(AuditAction::CreateJob);
        }
        if is_update {
            return Some(AuditAction::UpdateJob);
        }
        if *method == Method::DELETE {
            return Some(AuditAction::DeleteJob);
        }
    }

    if path.contains("/seed/jobs") {
        if *method == Method::POST {
            return Some(AuditAction::SeedJobs);
        }
        if *method == Method::DELETE {
            return Some(AuditAction::ClearSeededJobs);
        }
    }

    if path.contains("/application") {
        if path.contains("/accept") {
            return Some(AuditAction::AcceptApplication);
        }
        if path.contains("/reject") {
            return Some(AuditAction::RejectApplication);
        }
        if is_update {
            return Some(AuditAction::UpdateApplication);
        }
        if *method == Method::DELETE {
            return Some(AuditAction::DeleteApplication);
        }
    }

    if path.contains("/user") {
        if *method == Method::POST {
            return Some(AuditAction::CreateUser);
        }
        if is_update {
            if path.contains("/suspend") {
                return Some(AuditAction::SuspendUser);
            }
            if path.contains("/activate") {
                return Some(AuditAction::ActivateUser);
            }
            return Some(AuditAction::UpdateUser);
        }
        if *method == Method::DELETE {
            return Some(AuditAction::DeleteUser);
        }
    }

    None
}
