use std::time::Duration;

use anyhow::{anyhow, Error};
use http::header::HeaderName;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use tokio_stream::StreamExt;

use crate::config::Config;
use crate::handler::text_response;
use crate::relay::{relay, RelayBody};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const FORWARDED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Headers that describe one hop's connection rather than the payload; they
/// are re-derived by each transport and must not be copied across.
fn is_hop_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
            | "content-length"
    )
}

/// Forwards the request verbatim to the configured backend origin and
/// relays the backend's status, headers, and body back unchanged. The
/// backend body streams through rather than being buffered.
pub async fn forward(config: &Config, req: Request<Incoming>) -> Result<Response<RelayBody>, Error> {
    if !FORWARDED_METHODS.contains(req.method()) {
        return Ok(text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
        ));
    }

    let method = req.method().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let target = format!("{}{}", config.backend_origin, path_and_query);
    let headers = req.headers().clone();
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to read request body: {e}"))?
        .to_bytes();

    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    let mut outbound = client.request(method, &target);
    for (name, value) in headers.iter() {
        if !is_hop_header(name) {
            outbound = outbound.header(name, value);
        }
    }
    let backend = outbound
        .body(body)
        .send()
        .await
        .map_err(|e| anyhow!("Backend request failed: {e}"))?;

    let status = backend.status();
    let backend_headers = backend.headers().clone();
    let chunks = backend
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| anyhow!("Backend stream failed: {e}")));

    let mut response = Response::new(relay(chunks));
    *response.status_mut() = status;
    for (name, value) in backend_headers.iter() {
        if !is_hop_header(name) {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
    Ok(response)
}
