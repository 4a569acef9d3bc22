use std::time::Duration;

use anyhow::{anyhow, Error};
use bytes::Bytes;
use http::header;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

const STATUS_PATH: &str = "/duckchat/v1/status";
const CHAT_PATH: &str = "/duckchat/v1/chat";
const VQD_ACCEPT_HEADER: &str = "x-vqd-accept";
const VQD_HEADER: &str = "x-vqd-4";
// The backend rejects clients that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: &'a [Value],
}

/// Client for the Duck.ai chat backend. The backend authorizes each chat
/// call with a short-lived session token minted by its status endpoint and
/// returned in the x-vqd-4 response header. Nothing is retained between
/// calls; the caller holds the token.
pub struct DuckChatClient {
    base_url: String,
}

impl DuckChatClient {
    pub fn new(base_url: &str) -> Self {
        DuckChatClient {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Mints a session token. Expiry is decided upstream and only shows up
    /// later as a failed chat call.
    pub async fn acquire_token(&self) -> Result<String, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TOKEN_TIMEOUT)
            .build()?;
        let response = client
            .get(format!("{}{}", self.base_url, STATUS_PATH))
            .header(VQD_ACCEPT_HEADER, "1")
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach token endpoint: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Token endpoint returned status {status}"));
        }
        response
            .headers()
            .get(VQD_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Token endpoint response carried no {VQD_HEADER} header"))
    }

    /// Submits a conversation and returns the response as a lazy chunk
    /// sequence. Chunks surface in arrival order; the sequence ends when
    /// the backend closes the stream, or with an Err item if the transport
    /// drops mid-way.
    pub async fn send_conversation(
        &self,
        token: &str,
        messages: &[Value],
        model: &str,
    ) -> Result<impl Stream<Item = Result<Bytes, Error>> + Send + 'static, Error> {
        let payload = ChatPayload { model, messages };
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;
        debug!(
            "Submitting conversation to {}{} with model {}",
            self.base_url, CHAT_PATH, model
        );
        let response = client
            .post(format!("{}{}", self.base_url, CHAT_PATH))
            .header(VQD_HEADER, token)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach chat endpoint: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Chat endpoint returned status {status}"));
        }
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| anyhow!("Chat stream failed: {e}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use http::header::HeaderValue;
    use http_body_util::BodyExt;
    use hyper::{Response, StatusCode};

    use crate::relay::{full, relay};
    use crate::test_support::spawn_http;

    #[tokio::test]
    async fn acquire_token_reads_the_vqd_header() {
        let addr = spawn_http(|_req| async {
            let mut response = Response::new(full(""));
            response
                .headers_mut()
                .insert("x-vqd-4", HeaderValue::from_static("vqd-token-123"));
            Ok(response)
        })
        .await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        let token = client.acquire_token().await.unwrap();
        assert_eq!(token, "vqd-token-123");
    }

    #[tokio::test]
    async fn acquire_token_fails_without_the_header() {
        let addr = spawn_http(|_req| async { Ok(Response::new(full("no header here"))) }).await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        let err = client.acquire_token().await.unwrap_err();
        assert!(err.to_string().contains("x-vqd-4"));
    }

    #[tokio::test]
    async fn acquire_token_fails_on_upstream_error_status() {
        let addr = spawn_http(|_req| async {
            let mut response = Response::new(full("down"));
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            Ok(response)
        })
        .await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        assert!(client.acquire_token().await.is_err());
    }

    #[tokio::test]
    async fn send_conversation_streams_chunks_and_forwards_the_request() {
        let captured: Arc<Mutex<Option<(String, Bytes)>>> = Arc::new(Mutex::new(None));
        let captured_in = captured.clone();
        let addr = spawn_http(move |req| {
            let captured = captured_in.clone();
            async move {
                let token = req
                    .headers()
                    .get("x-vqd-4")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body = req.into_body().collect().await.unwrap().to_bytes();
                *captured.lock().unwrap() = Some((token, body));
                let chunks = vec![
                    Ok(Bytes::from("data: first\n\n")),
                    Ok(Bytes::from("data: second\n\n")),
                ];
                Ok(Response::new(relay(tokio_stream::iter(chunks))))
            }
        })
        .await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        let messages = vec![serde_json::json!({"role": "user", "content": "hello"})];
        let stream = client
            .send_conversation("vqd-token-123", &messages, "test-model")
            .await
            .unwrap();
        let chunks: Vec<_> = stream.collect().await;
        let output: Vec<u8> = chunks
            .into_iter()
            .flat_map(|chunk| chunk.unwrap().to_vec())
            .collect();
        assert_eq!(output, b"data: first\n\ndata: second\n\n");

        let (token, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(token, "vqd-token-123");
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn send_conversation_forwards_an_empty_message_list_unchanged() {
        let captured: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
        let captured_in = captured.clone();
        let addr = spawn_http(move |req| {
            let captured = captured_in.clone();
            async move {
                let body = req.into_body().collect().await.unwrap().to_bytes();
                *captured.lock().unwrap() = Some(body);
                Ok(Response::new(full("ok")))
            }
        })
        .await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        let stream = client
            .send_conversation("vqd", &[], "test-model")
            .await
            .unwrap();
        let _: Vec<_> = stream.collect().await;

        let body = captured.lock().unwrap().take().unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["messages"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn send_conversation_fails_on_error_status() {
        let addr = spawn_http(|_req| async {
            let mut response = Response::new(full("expired"));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            Ok(response)
        })
        .await;

        let client = DuckChatClient::new(&format!("http://{addr}"));
        let result = client
            .send_conversation("stale", &[], "test-model")
            .await;
        let err = match result {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("401"));
    }
}
