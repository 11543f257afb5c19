//! Audit middleware for admin actions
//!
//! Runs after authentication. Requests from an admin-like principal whose
//! method and path map to an [`AuditAction`](super::AuditAction) get an
//! [`ExchangeAudit`]; once the handler responds, the outcome is recorded in a
//! detached task and the response is returned untouched.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{ConnectInfo, OriginalUri, Request},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::{future, stream, Stream, StreamExt};
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::classify::classify;
use super::exchange::{ExchangeAudit, ExchangeDetails};
use super::models::UNKNOWN;
use super::roles::AdminRoles;
use super::sanitize::sanitize_body;
use super::store::SharedAuditStore;
use crate::auth::Principal;

/// Largest error response body that is buffered to extract a message
pub const MAX_ERROR_BODY_BYTES: u64 = 64 * 1024;

/// Largest request body captured as the audit payload; matches axum's default body limit
pub const MAX_REQUEST_BODY_BYTES: u64 = 2 * 1024 * 1024;

/// Audit logging layer
#[derive(Clone)]
pub struct AuditLayer {
    store: SharedAuditStore,
    roles: AdminRoles,
}

impl AuditLayer {
    pub fn new(store: SharedAuditStore, roles: AdminRoles) -> Self {
        Self { store, roles }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            store: self.store.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Audit middleware service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    store: SharedAuditStore,
    roles: AdminRoles,
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The clone that was polled ready is the one that must be called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let store = self.store.clone();
        let roles = self.roles.clone();

        Box::pin(async move {
            let Some(principal) = request.extensions().get::<Principal>().cloned() else {
                return inner.call(request).await;
            };

            if !roles.contains(&principal.role) {
                debug!(role = %principal.role, "Skipping audit: not an admin role");
                return inner.call(request).await;
            }

            let endpoint = request
                .extensions()
                .get::<OriginalUri>()
                .map(|uri| uri.0.path().to_string())
                .unwrap_or_else(|| request.uri().path().to_string());

            let Some(action) = classify(request.method(), &endpoint) else {
                debug!(method = %request.method(), endpoint = %endpoint, "No audit action");
                return inner.call(request).await;
            };

            let source_address = source_address(&request);
            let user_agent = header_text(request.headers(), header::USER_AGENT.as_str())
                .unwrap_or(UNKNOWN)
                .to_string();
            let method = request.method().to_string();

            let (parts, body) = request.into_parts();
            let (body, request_payload) = match capture_body(body, MAX_REQUEST_BODY_BYTES).await {
                Capture::Complete(bytes) => {
                    let payload = request_payload(&bytes);
                    (Body::from(bytes), payload)
                },
                Capture::TooLarge(body) => {
                    debug!(endpoint = %endpoint, "Request body too large to capture");
                    (body, None)
                },
                Capture::Failed { body, error } => {
                    warn!(
                        method = %method,
                        endpoint = %endpoint,
                        error = %error,
                        "Failed to capture request body"
                    );
                    (body, None)
                },
            };
            let request = Request::from_parts(parts, body);

            let audit = ExchangeAudit::new(
                store,
                ExchangeDetails {
                    admin_id: principal.id.clone(),
                    admin_name: principal.name.clone(),
                    admin_email: principal.email.clone(),
                    admin_role: principal.role.clone(),
                    actor: principal.display_name().to_string(),
                    action,
                    method,
                    endpoint,
                    source_address,
                    user_agent,
                    request_payload,
                },
            );

            let response = inner.call(request).await?;

            Ok(record_response(&audit, response).await)
        })
    }
}

/// Hand the finished response to the matching completion path and return it unchanged
async fn record_response(audit: &ExchangeAudit, response: Response) -> Response {
    let status = response.status();
    let json = is_json(response.headers());

    if status.as_u16() < 400 {
        if json {
            audit.complete_json(status, &JsonValue::Null);
        } else {
            audit.complete_raw(status, &[]);
        }
        return response;
    }

    let bounded = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_ERROR_BODY_BYTES);

    if !bounded {
        // Streaming or oversized body: record the status without reading it.
        audit.complete_json(status, &JsonValue::Null);
        return response;
    }

    let (parts, body) = response.into_parts();
    match capture_body(body, MAX_ERROR_BODY_BYTES).await {
        Capture::Complete(bytes) => {
            complete_error(audit, status, json, &bytes);
            Response::from_parts(parts, Body::from(bytes))
        },
        Capture::TooLarge(body) => {
            audit.complete_json(status, &JsonValue::Null);
            Response::from_parts(parts, body)
        },
        Capture::Failed { body, error } => {
            warn!(
                endpoint = %audit.details().endpoint,
                error = %error,
                "Failed to capture error response body"
            );
            audit.complete_json(status, &JsonValue::Null);
            Response::from_parts(parts, body)
        },
    }
}

/// Result of reading a body for the audit record
enum Capture {
    /// The whole body, at most the capture limit
    Complete(Bytes),
    /// Larger than the limit; the body replays everything unread or already read
    TooLarge(Body),
    /// Reading failed; the body replays the bytes read and then the same error
    Failed { body: Body, error: String },
}

/// Buffer `body` up to `limit` bytes without losing anything the consumer would see
async fn capture_body(mut body: Body, limit: u64) -> Capture {
    if body.size_hint().lower() > limit {
        return Capture::TooLarge(body);
    }

    let mut buffered = Vec::new();
    loop {
        let next = body.frame().await;
        match next {
            None => return Capture::Complete(Bytes::from(buffered)),
            Some(Ok(frame)) => {
                // Trailers are not carried over.
                let Ok(data) = frame.into_data() else {
                    continue;
                };
                buffered.extend_from_slice(&data);
                if buffered.len() as u64 > limit {
                    return Capture::TooLarge(replay(buffered, body.into_data_stream()));
                }
            },
            Some(Err(e)) => {
                let error = e.to_string();
                let body = replay(buffered, stream::once(future::ready(Err(e))));
                return Capture::Failed { body, error };
            },
        }
    }
}

/// A body yielding `read` followed by `rest`
fn replay<S>(read: Vec<u8>, rest: S) -> Body
where
    S: Stream<Item = Result<Bytes, axum::Error>> + Send + 'static,
{
    let head = stream::once(future::ready(Ok(Bytes::from(read))));
    Body::from_stream(head.chain(rest))
}

fn complete_error(audit: &ExchangeAudit, status: StatusCode, json: bool, bytes: &[u8]) {
    if json {
        if let Ok(value) = serde_json::from_slice::<JsonValue>(bytes) {
            audit.complete_json(status, &value);
            return;
        }
    }
    audit.complete_raw(status, bytes);
}

/// Sanitized JSON body, or `None` for empty and non-JSON bodies
fn request_payload(body: &Bytes) -> Option<JsonValue> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<JsonValue>(body)
        .ok()
        .map(|value| sanitize_body(&value))
}

fn is_json(headers: &HeaderMap) -> bool {
    header_text(headers, header::CONTENT_TYPE.as_str())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Peer address, then the first `X-Forwarded-For` hop, then [`UNKNOWN`]
fn source_address(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    header_text(request.headers(), "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
