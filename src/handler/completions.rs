use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use tracing::{error, info};
use uuid::Uuid;

use crate::clients::duckchat::DuckChatClient;
use crate::config::Config;
use crate::models::conversation::ConversationRequest;
use crate::models::{ErrorDetail, ErrorResponse, TokenResponse};
use crate::relay::{relay, RelayBody};

use super::{json_response, text_response};

const EVENT_STREAM: &str = "text/event-stream";
const PLAIN_TEXT: &str = "text/plain";

pub async fn get_token(config: &Config) -> Response<RelayBody> {
    let client = DuckChatClient::new(&config.upstream_url);
    match client.acquire_token().await {
        Ok(token) => json_response(
            StatusCode::OK,
            &TokenResponse {
                message: "Success creating a token".to_string(),
                token,
            },
        ),
        Err(e) => {
            error!("Token acquisition failed: {e:#}");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: ErrorDetail {
                        message: "Error creating a token".to_string(),
                    },
                },
            )
        }
    }
}

/// Parses the conversation body (an absent body means "all defaults"),
/// submits it upstream, and relays the answer. The stream flag only picks
/// the declared media type; the body is the upstream chunk sequence either
/// way.
pub async fn completions(config: &Config, whole_body: Bytes) -> Response<RelayBody> {
    let json_string = String::from_utf8_lossy(&whole_body);
    let request = if json_string.trim().is_empty() {
        ConversationRequest::default()
    } else {
        match ConversationRequest::from_json(&json_string) {
            Ok(request) => request,
            Err(e) => {
                error!("Rejecting completion request with unreadable body: {e}");
                return text_response(StatusCode::BAD_REQUEST, "Request body is not valid JSON");
            }
        }
    };

    let trace_id = Uuid::new_v4();
    info!(
        "Completion request {}: model={} stream={} messages={}",
        trace_id,
        request.model,
        request.stream,
        request.message.len()
    );

    let client = DuckChatClient::new(&config.upstream_url);
    match client
        .send_conversation(&request.token, &request.message, &request.model)
        .await
    {
        Ok(chunks) => {
            let media_type = if request.stream { EVENT_STREAM } else { PLAIN_TEXT };
            let mut response = Response::new(relay(chunks));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(media_type));
            response
        }
        Err(e) => {
            error!("Conversation {} failed upstream: {e:#}", trace_id);
            json_response(
                StatusCode::BAD_GATEWAY,
                &ErrorResponse {
                    error: ErrorDetail {
                        message: "Upstream conversation request failed".to_string(),
                    },
                },
            )
        }
    }
}
