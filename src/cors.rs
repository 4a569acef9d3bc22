use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use http::HeaderMap;
use hyper::{Response, StatusCode};

use crate::config::Config;
use crate::relay::{empty, RelayBody};

/// Attaches CORS headers to a response when the request origin is in the
/// configured set. Origins are compared verbatim; a literal "*" entry
/// allows any origin, and the concrete origin is still echoed back so
/// credentialed requests keep working.
pub fn apply(config: &Config, request_headers: &HeaderMap, response: &mut Response<RelayBody>) {
    let Some(origin) = allowed_origin(config, request_headers) else {
        return;
    };
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(VARY, HeaderValue::from_static("Origin"));
}

/// Preflight answer: GET/POST only, any header.
pub fn preflight(config: &Config, request_headers: &HeaderMap) -> Response<RelayBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    if allowed_origin(config, request_headers).is_some() {
        let headers = response.headers_mut();
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST"),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    }
    response
}

fn allowed_origin(config: &Config, request_headers: &HeaderMap) -> Option<HeaderValue> {
    let origin = request_headers.get(ORIGIN)?;
    let value = origin.to_str().ok()?;
    config
        .allowed_origins
        .iter()
        .any(|allowed| allowed == value || allowed == "*")
        .then(|| origin.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::full;

    fn config_with(origins: &[&str]) -> Config {
        let mut config = Config::default();
        config.allowed_origins = origins.iter().map(|s| s.to_string()).collect();
        config
    }

    fn request_headers(origin: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static(origin));
        headers
    }

    #[test]
    fn echoes_a_configured_origin() {
        let config = config_with(&["http://localhost:3000"]);
        let mut response = Response::new(full("ok"));
        apply(
            &config,
            &request_headers("http://localhost:3000"),
            &mut response,
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[test]
    fn skips_an_unlisted_origin() {
        let config = config_with(&["http://localhost:3000"]);
        let mut response = Response::new(full("ok"));
        apply(&config, &request_headers("http://evil.example"), &mut response);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn wildcard_entry_allows_any_origin() {
        let config = config_with(&["*"]);
        let mut response = Response::new(full("ok"));
        apply(&config, &request_headers("http://anywhere.example"), &mut response);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://anywhere.example"
        );
    }

    #[test]
    fn preflight_advertises_get_and_post() {
        let config = config_with(&["http://localhost:3000"]);
        let response = preflight(&config, &request_headers("http://localhost:3000"));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "GET, POST"
        );
    }

    #[test]
    fn preflight_stays_bare_for_unlisted_origins() {
        let config = config_with(&["http://localhost:3000"]);
        let response = preflight(&config, &request_headers("http://evil.example"));
        assert!(response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_METHODS)
            .is_none());
    }
}
