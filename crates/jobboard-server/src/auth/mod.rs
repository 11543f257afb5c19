//! Bearer-token authentication
//!
//! The [`authenticate`] middleware resolves the request's [`Principal`] from an
//! HS256 JWT and stores it in the request extensions. Requests without a valid
//! token continue anonymously; handlers that need an admin use [`RequireAdmin`].

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::audit::AdminRoles;
use crate::error::AppError;

/// Authenticated user attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: String,
}

impl Principal {
    /// Email if known, otherwise the name, otherwise the id
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
    pub exp: usize,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Issues and verifies tokens with a shared secret
#[derive(Clone)]
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String, AppError> {
        let exp = (Utc::now() + self.token_ttl).timestamp();
        let claims = Claims {
            sub: principal.id.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role.clone(),
            exp: usize::try_from(exp).unwrap_or(0),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.into())
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Attach the [`Principal`] for a valid bearer token; otherwise pass through
pub async fn authenticate(
    State(auth): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match auth.verify(token) {
            Ok(principal) => {
                request.extensions_mut().insert(principal);
            },
            Err(e) => {
                debug!(error = %e, "Ignoring invalid bearer token");
            },
        }
    }

    next.run(request).await
}

/// Extractor that rejects requests whose principal is missing or not admin-like
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AdminRoles: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        if !AdminRoles::from_ref(state).contains(&principal.role) {
            return Err(AppError::Forbidden(
                "Access denied. Admin credentials required.".to_string(),
            ));
        }

        Ok(RequireAdmin(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const TEST_SECRET: &str = "unit-test-secret-0123456789";

    fn admin() -> Principal {
        Principal {
            id: "64f0c2a1".to_string(),
            email: Some("admin@jobs.test".to_string()),
            name: None,
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = Authenticator::new(TEST_SECRET, 1);
        let token = auth.issue_token(&admin()).unwrap();

        assert_eq!(auth.verify(&token).unwrap(), admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = Authenticator::new(TEST_SECRET, 1).issue_token(&admin()).unwrap();
        let other = Authenticator::new("another-secret", 1);

        assert!(matches!(other.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = Authenticator::new(TEST_SECRET, -2);
        let token = auth.issue_token(&admin()).unwrap();

        assert!(auth.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut principal = admin();
        assert_eq!(principal.display_name(), "admin@jobs.test");

        principal.email = None;
        principal.name = Some("Dana".to_string());
        assert_eq!(principal.display_name(), "Dana");

        principal.name = None;
        assert_eq!(principal.display_name(), "64f0c2a1");
    }
}
