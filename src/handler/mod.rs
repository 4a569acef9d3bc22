use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::access;
use crate::config::Config;
use crate::cors;
use crate::models::StatusResponse;
use crate::relay::{full, RelayBody};

pub mod completions;

/// Entry point for every facade request. The access gate runs before any
/// routing; CORS headers are attached to whatever the router produced.
pub async fn handle(
    req: Request<Incoming>,
    peer: IpAddr,
    config: Arc<Config>,
) -> Result<Response<RelayBody>, Infallible> {
    info!("Received request: {} {}", req.method(), req.uri().path());

    if !access::permitted(&config, peer, req.headers()) {
        return Ok(access::denied());
    }

    let request_headers = req.headers().clone();
    let mut response = route(req, &config).await;
    cors::apply(&config, &request_headers, &mut response);
    Ok(response)
}

async fn route(req: Request<Incoming>, config: &Config) -> Response<RelayBody> {
    match (req.method(), req.uri().path()) {
        (&Method::OPTIONS, _) => cors::preflight(config, req.headers()),
        (&Method::GET, "/") => alive(),
        (&Method::GET, "/v1/get-token") => completions::get_token(config).await,
        (&Method::POST, "/v1/chat/completions") => {
            let whole_body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    error!("Failed to read request body: {e}");
                    return text_response(StatusCode::BAD_REQUEST, "Failed to read request body");
                }
            };
            completions::completions(config, whole_body).await
        }
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn alive() -> Response<RelayBody> {
    json_response(
        StatusCode::OK,
        &StatusResponse {
            message: "API is Alive!".to_string(),
        },
    )
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<RelayBody> {
    let body = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response body: {e}");
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };
    let mut response = Response::new(full(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub(crate) fn text_response(status: StatusCode, body: &'static str) -> Response<RelayBody> {
    let mut response = Response::new(full(body));
    *response.status_mut() = status;
    response
}
