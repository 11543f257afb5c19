//! End-to-end tests: bearer token -> audit middleware -> admin audit API

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{patch, post},
    Json, Router,
};
use http_body_util::BodyExt;
use jobboard_server::{
    api::{self, AppState},
    audit::MemoryAuditStore,
    auth::{Authenticator, Principal},
    config::Config,
};
use serde_json::{json, Value as JsonValue};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = SECRET.to_string();
    config
}

fn token(id: &str, role: &str) -> String {
    Authenticator::new(SECRET, 1)
        .issue_token(&Principal {
            id: id.to_string(),
            email: Some(format!("{}@jobs.test", id)),
            name: None,
            role: role.to_string(),
        })
        .unwrap()
}

async fn create_job(Json(body): Json<JsonValue>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "success": true, "data": body })))
}

async fn reject_application() -> impl IntoResponse {
    (
        StatusCode::CONFLICT,
        Json(json!({ "success": false, "message": "Application already processed" })),
    )
}

struct TestApp {
    store: MemoryAuditStore,
    config: Config,
}

impl TestApp {
    fn new(config: Config) -> Self {
        Self {
            store: MemoryAuditStore::new(),
            config,
        }
    }

    fn router(&self) -> Router {
        let state = AppState::new(Arc::new(self.store.clone()), &self.config);
        let jobs = Router::new()
            .route("/api/jobs", post(create_job))
            .route("/api/applications/:id/reject", patch(reject_application));

        api::with_middleware(api::router(state.clone()).merge(jobs), &state, &self.config)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response: Response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn wait_for_records(&self, expected: usize) -> usize {
        for _ in 0..100 {
            let len = self.store.len().await;
            if len >= expected {
                return len;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.store.len().await
    }
}

fn authed(method: Method, uri: &str, token: Option<&str>, body: Option<JsonValue>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.4");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_admin_actions_are_listed() {
    let app = TestApp::new(config());
    let admin = token("admin-7", "admin");

    let (status, _) = app
        .send(authed(
            Method::POST,
            "/api/jobs",
            Some(admin.as_str()),
            Some(json!({ "title": "SRE", "apiKey": "k-123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(authed(Method::PATCH, "/api/applications/5/reject", Some(admin.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(app.wait_for_records(2).await, 2);

    let (status, body) = app
        .send(authed(
            Method::GET,
            "/api/audit-logs?sort_by=action&sort_order=asc",
            Some(admin.as_str()),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let logs = body["data"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["action"], json!("Create Job"));
    assert_eq!(logs[0]["admin_id"], json!("admin-7"));
    assert_eq!(logs[0]["admin_email"], json!("admin-7@jobs.test"));
    assert_eq!(logs[0]["admin_role"], json!("admin"));
    assert_eq!(logs[0]["source_address"], json!("198.51.100.4"));
    assert_eq!(logs[0]["request_payload"]["apiKey"], json!("***REDACTED***"));
    assert_eq!(logs[1]["action"], json!("Reject Application"));
    assert_eq!(logs[1]["status_code"], json!(409));
    assert_eq!(logs[1]["error_message"], json!("Application already processed"));
    assert_eq!(body["data"]["pagination"]["total_count"], json!(2));
}

#[tokio::test]
async fn test_audit_api_reads_are_not_audited() {
    let app = TestApp::new(config());
    let admin = token("admin-7", "Admin");

    for uri in ["/api/audit-logs", "/api/audit-logs/stats", "/api/audit-logs/actions"] {
        let (status, _) = app.send(authed(Method::GET, uri, Some(admin.as_str()), None)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_non_admin_is_forbidden_and_not_audited() {
    let app = TestApp::new(config());
    let seeker = token("user-1", "jobseeker");

    let (status, body) = app
        .send(authed(Method::GET, "/api/audit-logs", Some(seeker.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Access denied. Admin credentials required." })
    );

    let (status, _) = app
        .send(authed(Method::POST, "/api/jobs", Some(seeker.as_str()), Some(json!({}))))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_invalid_token_is_anonymous() {
    let app = TestApp::new(config());
    let forged = Authenticator::new("other-secret", 1)
        .issue_token(&Principal {
            id: "x".to_string(),
            email: None,
            name: None,
            role: "admin".to_string(),
        })
        .unwrap();

    let (status, _) = app
        .send(authed(Method::POST, "/api/jobs", Some(forged.as_str()), Some(json!({}))))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(authed(Method::GET, "/api/audit-logs", Some(forged.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_stats_and_actions() {
    let app = TestApp::new(config());
    let first = token("admin-1", "admin");
    let second = token("admin-2", "Recruiter");

    for token in [&first, &first, &second] {
        app.send(authed(Method::POST, "/api/jobs", Some(token.as_str()), Some(json!({}))))
            .await;
    }
    app.send(authed(Method::PATCH, "/api/applications/9/reject", Some(second.as_str()), None))
        .await;
    assert_eq!(app.wait_for_records(4).await, 4);

    let (_, body) = app
        .send(authed(Method::GET, "/api/audit-logs/stats", Some(first.as_str()), None))
        .await;
    let stats = &body["data"];
    assert_eq!(stats["total_logs"], json!(4));
    assert_eq!(stats["recent_logs"], json!(4));
    assert_eq!(
        stats["action_breakdown"][0],
        json!({ "action": "Create Job", "count": 3 })
    );
    assert_eq!(stats["active_admins"].as_array().unwrap().len(), 2);
    assert_eq!(stats["active_admins"][0]["admin_id"], json!("admin-1"));
    assert_eq!(stats["active_admins"][0]["admin_email"], json!("admin-1@jobs.test"));

    let (_, body) = app
        .send(authed(Method::GET, "/api/audit-logs/actions", Some(first.as_str()), None))
        .await;
    assert_eq!(body["data"], json!(["Create Job", "Reject Application"]));
}

#[tokio::test]
async fn test_list_filters_and_bad_query() {
    let app = TestApp::new(config());
    let admin = token("admin-1", "admin");

    app.send(authed(Method::POST, "/api/jobs", Some(admin.as_str()), Some(json!({}))))
        .await;
    app.send(authed(Method::PATCH, "/api/applications/3/reject", Some(admin.as_str()), None))
        .await;
    assert_eq!(app.wait_for_records(2).await, 2);

    let (status, body) = app
        .send(authed(
            Method::GET,
            "/api/audit-logs?action=Reject%20Application&limit=1",
            Some(admin.as_str()),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_count"], json!(1));
    assert_eq!(body["data"]["logs"][0]["action"], json!("Reject Application"));

    let (status, body) = app
        .send(authed(Method::GET, "/api/audit-logs?page=abc", Some(admin.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_cleanup_keeps_recent_records() {
    let app = TestApp::new(config());
    let admin = token("admin-1", "admin");

    app.send(authed(Method::POST, "/api/jobs", Some(admin.as_str()), Some(json!({}))))
        .await;
    assert_eq!(app.wait_for_records(1).await, 1);

    let (status, body) = app
        .send(authed(Method::DELETE, "/api/audit-logs/cleanup?days=30", Some(admin.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted_count"], json!(0));

    let (status, _) = app
        .send(authed(Method::DELETE, "/api/audit-logs/cleanup?days=0", Some(admin.as_str()), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(authed(
            Method::DELETE,
            "/api/audit-logs/cleanup?days=4000000000",
            Some(admin.as_str()),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    // The cleanup call itself is not an auditable action.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_audit_can_be_disabled() {
    let mut config = config();
    config.audit.enabled = false;
    let app = TestApp::new(config);

    let (status, _) = app
        .send(authed(
            Method::POST,
            "/api/jobs",
            Some(token("admin-1", "admin").as_str()),
            Some(json!({})),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.store.is_empty().await);
}
