//! Provider-neutral language model interface

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One piece of a conversation turn
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
    ToolResult { name: String, response: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// Function declaration offered to the model
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema (OpenAPI subset) of the arguments object
    pub parameters: Value,
}

pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub turns: &'a [Turn],
    pub tools: &'a [ToolDeclaration],
}

/// Model output: either text, tool calls, or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Model returned no candidates")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError>;
}

#[cfg(test)]
pub(crate) mod scripted {
    //! A model that replays canned replies, for tests

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ModelReply, String>>>,
        pub requests: Mutex<Vec<(usize, usize)>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<ModelReply, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn text(text: &str) -> Result<ModelReply, String> {
            Ok(ModelReply {
                text: text.to_string(),
                tool_calls: Vec::new(),
            })
        }

        pub fn call(name: &str, args: Value) -> Result<ModelReply, String> {
            Ok(ModelReply {
                text: String::new(),
                tool_calls: vec![ToolCall {
                    name: name.to_string(),
                    args,
                }],
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
            self.requests
                .lock()
                .unwrap()
                .push((request.turns.len(), request.tools.len()));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(body)) => Err(ModelError::Api { status: 500, body }),
                None => Err(ModelError::EmptyResponse),
            }
        }
    }
}
