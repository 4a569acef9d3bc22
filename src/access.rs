use std::net::IpAddr;

use http::HeaderMap;
use hyper::{Response, StatusCode};
use tracing::warn;

use crate::config::Config;
use crate::relay::{full, RelayBody};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Decides whether a client address may reach the facade. The gate is off
/// unless an allowlist is configured; a configured but empty allowlist
/// rejects everyone.
pub fn permitted(config: &Config, peer: IpAddr, headers: &HeaderMap) -> bool {
    let Some(allowlist) = &config.allowed_ips else {
        return true;
    };
    let client = if config.trust_forwarded_for {
        forwarded_client(headers).unwrap_or(peer)
    } else {
        peer
    };
    allowlist.contains(&client)
}

pub fn denied() -> Response<RelayBody> {
    let mut response = Response::new(full("Access denied"));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}

/// First address in X-Forwarded-For. Only consulted when the deployment has
/// explicitly opted in to trusting the header; the transport-level peer
/// address is authoritative otherwise.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    match first.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            warn!("Unparseable {} entry: {}", FORWARDED_FOR, first);
            None
        }
    }
}
