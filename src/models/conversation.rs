use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Message;

/// Body accepted by the completions endpoint. Every field carries a default
/// so clients may omit any of them. The message list is a sequence of raw
/// JSON values: whatever shape the client sends is forwarded to the
/// upstream service untouched.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversationRequest {
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_message")]
    pub message: Vec<Value>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_token() -> String {
    "use /v1/get-token to get token".to_string()
}

fn default_model() -> String {
    "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo".to_string()
}

fn default_message() -> Vec<Value> {
    let greeting = Message {
        role: "user".to_string(),
        content: "Hey! Are you there ?".to_string(),
    };
    vec![serde_json::json!(greeting)]
}

fn default_stream() -> bool {
    true
}

impl Default for ConversationRequest {
    fn default() -> Self {
        ConversationRequest {
            token: default_token(),
            model: default_model(),
            message: default_message(),
            stream: default_stream(),
        }
    }
}

impl ConversationRequest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
