use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, field};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Per-request metadata shared by logging and the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub trace_id: String,
    pub method: String,
    pub path: String,
    pub client_ip: Option<String>,
}

impl RequestContext {
    /// Audit entity, e.g. `POST /api/v1/surveys/action`.
    pub fn entity(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

pub async fn request_logging_middleware(mut req: Request, next: Next) -> Response {
    let request_id = header_or_generate(req.headers(), REQUEST_ID_HEADER);
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| request_id.clone());

    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let ctx = request_context(&req, &request_id, &trace_id);
    req.extensions_mut().insert(ctx);

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        trace_id = %trace_id,
        method = %method,
        path = %path,
        status = field::Empty,
        latency_ms = field::Empty
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let latency_ms = start.elapsed().as_millis();
    let status = response.status();

    span.record("status", field::display(status.as_u16()));
    span.record("latency_ms", field::display(latency_ms));

    if status.is_server_error() {
        tracing::error!(parent: &span, status = %status.as_u16(), latency_ms = %latency_ms, "Request completed with server error");
    } else if status.is_client_error() {
        tracing::warn!(parent: &span, status = %status.as_u16(), latency_ms = %latency_ms, "Request completed with client error");
    } else {
        tracing::info!(parent: &span, status = %status.as_u16(), latency_ms = %latency_ms, "Request completed");
    }

    insert_header(&mut response, REQUEST_ID_HEADER, &request_id);
    insert_header(&mut response, TRACE_ID_HEADER, &trace_id);

    response
}

fn request_context(req: &Request, request_id: &str, trace_id: &str) -> RequestContext {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    RequestContext {
        request_id: request_id.to_string(),
        trace_id: trace_id.to_string(),
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        client_ip: client_ip(req.headers(), peer),
    }
}

fn header_or_generate(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// First hop of `x-forwarded-for`, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn insert_header(response: &mut Response, name: &'static str, value: &str) {
    let name = HeaderName::from_static(name);
    if let Ok(header_value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, header_value);
    }
}
