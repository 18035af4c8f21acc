//! Chat orchestration: conversation bookkeeping and the tool-calling loop

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{LanguageModel, ModelError, ModelRequest, Part, Role, ToolDeclaration, Turn};
use super::tools::{all_declarations, Tool, ToolError, ToolRunner};
use crate::store::conversations::{
    Conversation, Message, MessageRole, NewConversation, NewMessage, HISTORY_LIMIT,
};
use crate::store::supabase::SupabaseError;
use crate::store::ConversationStore;

/// Rounds of tool calls before the model must answer in text
pub const MAX_TOOL_ROUNDS: usize = 3;

pub const MAX_CONTENT_CHARS: usize = 4000;
const TITLE_CHARS: usize = 50;

const SYSTEM_PROMPT: &str = "You are InvoChat, an inventory analyst for a small e-commerce business. \
Answer questions about stock levels, sales, suppliers and purchasing using the tools provided. \
Always call a tool when the question needs company data and never invent numbers. \
Money values from tools are in cents; present them in dollars. \
Keep answers short and practical, and suggest a next action when one is obvious.";

const ERROR_REPLY: &str = "Sorry, I ran into a problem answering that. Please try again in a moment.";
const EMPTY_REPLY: &str = "I could not find an answer to that. Could you rephrase the question?";
const TOOL_ONLY_REPLY: &str = "Here is what I found.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("AI chat is not configured")]
    Unavailable,

    #[error("{0}")]
    InvalidContent(String),

    #[error(transparent)]
    Store(#[from] SupabaseError),

    #[error("Model failed for conversation {conversation_id}: {source}")]
    Model {
        conversation_id: Uuid,
        #[source]
        source: ModelError,
    },
}

/// The assistant's reply and the conversation it belongs to
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub conversation_id: Uuid,
    pub message: Message,
}

struct Answer {
    text: String,
    last_tool: Option<(Tool, Value)>,
}

#[derive(Clone)]
pub struct ChatService {
    model: Option<Arc<dyn LanguageModel>>,
    conversations: ConversationStore,
    tools: ToolRunner,
}

/// Trim and bound user input
pub fn validate_content(content: &str) -> Result<&str, ChatError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ChatError::InvalidContent("Message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(ChatError::InvalidContent(format!(
            "Message cannot exceed {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(trimmed)
}

pub fn conversation_title(content: &str) -> String {
    content.chars().take(TITLE_CHARS).collect()
}

/// Stored messages as model turns. Failed replies are skipped, runs of the
/// same role are merged and the history always opens with a user turn.
pub fn history_turns(messages: &[Message]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    for message in messages.iter().filter(|m| !m.is_error) {
        let role = match message.role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Model,
        };
        if turns.is_empty() && role == Role::Model {
            continue;
        }
        match turns.last_mut() {
            Some(last) if last.role == role => last.parts.push(Part::Text(message.content.clone())),
            _ => turns.push(Turn {
                role,
                parts: vec![Part::Text(message.content.clone())],
            }),
        }
    }
    turns
}

fn tool_failure(err: &ToolError) -> Value {
    let message = match err {
        ToolError::Store(_) | ToolError::Encode(_) => "The data could not be loaded".to_string(),
        other => other.to_string(),
    };
    json!({ "error": message })
}

impl ChatService {
    pub fn new(
        model: Option<Arc<dyn LanguageModel>>,
        conversations: ConversationStore,
        tools: ToolRunner,
    ) -> Self {
        Self {
            model,
            conversations,
            tools,
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Handle one user message. An unknown or absent conversation id starts
    /// a new conversation, keeping the supplied id.
    pub async fn send(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        content: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<ChatReply, ChatError> {
        let content = validate_content(content)?;
        let model = self.model.clone().ok_or(ChatError::Unavailable)?;

        let (conversation, existing) = self
            .resolve_conversation(company_id, user_id, conversation_id, content)
            .await?;

        let mut turns = if existing {
            let history = self
                .conversations
                .recent_messages(company_id, conversation.id, HISTORY_LIMIT - 1)
                .await?;
            history_turns(&history)
        } else {
            Vec::new()
        };
        match turns.last_mut() {
            Some(last) if last.role == Role::User => last.parts.push(Part::Text(content.to_string())),
            _ => turns.push(Turn::user(content)),
        }

        self.conversations
            .add_message(&NewMessage::user(company_id, conversation.id, content))
            .await?;

        let answer = match self.answer(model.as_ref(), company_id, turns).await {
            Ok(answer) => answer,
            Err(source) => {
                warn!(
                    conversation_id = %conversation.id,
                    error = %source,
                    "Model call failed"
                );
                let mut failed = NewMessage::assistant(company_id, conversation.id, ERROR_REPLY);
                failed.is_error = true;
                if let Err(err) = self.conversations.add_message(&failed).await {
                    warn!(error = %err, "Failed to record error reply");
                }
                return Err(ChatError::Model {
                    conversation_id: conversation.id,
                    source,
                });
            }
        };

        let mut reply = NewMessage::assistant(company_id, conversation.id, answer.text);
        if let Some((tool, result)) = answer.last_tool {
            reply.component = Some(tool.component().to_string());
            reply.visualization = tool.visualization(&result);
            reply.component_props = Some(result);
        }
        let message = self.conversations.add_message(&reply).await?;

        if let Err(err) = self.conversations.touch(company_id, conversation.id).await {
            warn!(error = %err, "Failed to update conversation access time");
        }

        info!(
            conversation_id = %conversation.id,
            component = message.component.as_deref().unwrap_or("none"),
            "Chat reply sent"
        );

        Ok(ChatReply {
            conversation_id: conversation.id,
            message,
        })
    }

    async fn resolve_conversation(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        content: &str,
    ) -> Result<(Conversation, bool), ChatError> {
        if let Some(id) = conversation_id {
            if let Some(conversation) = self.conversations.get(company_id, user_id, id).await? {
                return Ok((conversation, true));
            }
            // the id may belong to someone else, so it is never reused
            info!(requested = %id, "Unknown conversation id, starting a new conversation");
        }

        let conversation = self
            .conversations
            .create(&NewConversation {
                id: Uuid::new_v4(),
                company_id,
                user_id,
                title: conversation_title(content),
            })
            .await?;
        Ok((conversation, false))
    }

    async fn answer(
        &self,
        model: &dyn LanguageModel,
        company_id: Uuid,
        mut turns: Vec<Turn>,
    ) -> Result<Answer, ModelError> {
        let declarations = all_declarations();
        let mut last_tool = None;
        let mut round = 0;

        loop {
            let tools: &[ToolDeclaration] = if round < MAX_TOOL_ROUNDS { &declarations } else { &[] };
            let reply = model
                .generate(ModelRequest {
                    system: SYSTEM_PROMPT,
                    turns: &turns,
                    tools,
                })
                .await?;

            if reply.tool_calls.is_empty() || tools.is_empty() {
                let text = match reply.text.trim() {
                    "" if last_tool.is_some() => TOOL_ONLY_REPLY.to_string(),
                    "" => EMPTY_REPLY.to_string(),
                    text => text.to_string(),
                };
                return Ok(Answer { text, last_tool });
            }

            let mut calls = Vec::with_capacity(reply.tool_calls.len());
            let mut results = Vec::with_capacity(reply.tool_calls.len());
            for call in reply.tool_calls {
                let response = match self.tools.run_named(company_id, &call.name, &call.args).await {
                    Ok((tool, value)) => {
                        last_tool = Some((tool, value.clone()));
                        value
                    }
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "Tool call failed");
                        tool_failure(&err)
                    }
                };
                results.push(Part::ToolResult {
                    name: call.name.clone(),
                    response,
                });
                calls.push(Part::ToolCall(call));
            }
            turns.push(Turn {
                role: Role::Model,
                parts: calls,
            });
            turns.push(Turn {
                role: Role::User,
                parts: results,
            });
            round += 1;
        }
    }
}
