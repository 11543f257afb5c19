//! Admin role gate

use std::{collections::HashSet, sync::Arc};

/// Role strings treated as admin-like when no override is configured.
///
/// Matching is exact: a principal with role `"ADMIN"` is not audited.
pub const DEFAULT_ADMIN_ROLES: [&str; 3] = ["admin", "Admin", "Recruiter"];

/// Set of roles whose requests are audited
#[derive(Debug, Clone)]
pub struct AdminRoles(Arc<HashSet<String>>);

impl AdminRoles {
    pub fn new<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self(Arc::new(roles.into_iter().map(Into::into).collect()))
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AdminRoles {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_ROLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let roles = AdminRoles::default();
        assert!(roles.contains("admin"));
        assert!(roles.contains("Admin"));
        assert!(roles.contains("Recruiter"));
        assert!(!roles.contains("jobseeker"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let roles = AdminRoles::default();
        assert!(!roles.contains("ADMIN"));
        assert!(!roles.contains("recruiter"));
        assert!(!roles.contains(" admin"));
    }

    #[test]
    fn test_custom_roles() {
        let roles = AdminRoles::new(vec!["superuser".to_string()]);
        assert!(roles.contains("superuser"));
        assert!(!roles.contains("admin"));
    }
}
