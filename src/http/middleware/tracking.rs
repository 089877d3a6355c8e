//! Access logging and request metrics.
//!
//! Runs as a route layer so the matched route template is available; that
//! template, not the raw path, is used as the metrics label.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{header, HeaderMap, Request, Version},
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let record = AccessRecord::from_request(&request);

    let response = next.run(request).await;

    metrics::record_request(&record.method, &record.route, response.status().as_u16(), start);
    record.log(&response, start);
    response
}

/// Request-side fields of one access log line.
#[derive(Debug)]
struct AccessRecord {
    request_id: String,
    method: String,
    protocol: &'static str,
    remote_ip: String,
    route: String,
    path: String,
    req_uri: String,
    bytes_in: u64,
}

impl AccessRecord {
    fn from_request(request: &Request<Body>) -> Self {
        let path = request.uri().path().to_owned();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| path.clone());
        let remote_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string());

        Self {
            request_id: request.headers().request_id().to_owned(),
            method: request.method().to_string(),
            protocol: protocol(request.version()),
            remote_ip,
            route,
            path,
            req_uri: request.uri().to_string(),
            bytes_in: content_length(request.headers()),
        }
    }

    fn log(&self, response: &Response, start: Instant) {
        tracing::debug!(
            request_id = %self.request_id,
            method = %self.method,
            protocol = self.protocol,
            remote_ip = %self.remote_ip,
            handler_path = %self.route,
            path = %self.path,
            req_uri = %self.req_uri,
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            bytes_in = self.bytes_in,
            bytes_out = content_length(response.headers()),
            "req received"
        );
    }
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "-",
    }
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
}
