//! Conversations and the AI chat endpoint

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{non_blank, ListResponse};
use crate::ai::ChatReply;
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::conversations::{Conversation, Message, NewConversation};
use crate::store::query::{PageParams, Pagination};

const DEFAULT_TITLE: &str = "New Conversation";
const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    conversation_id: Uuid,
    new_message: Message,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            conversation_id: reply.conversation_id,
            new_message: reply.message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    content: String,
    conversation_id: Option<Uuid>,
}

fn check_rate_limit(state: &AppState, auth: &AuthenticatedUser) -> Result<(), AppError> {
    if state.rate_limits.check_chat(auth.user_id) {
        Ok(())
    } else {
        warn!(user_id = %auth.user_id, "Chat rate limit exceeded");
        Err(AppError::RateLimited)
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    check_rate_limit(&state, &auth)?;

    let reply = state
        .chat
        .send(auth.company_id, auth.user_id, &req.content, req.conversation_id)
        .await?;
    Ok(Json(reply.into()))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<Conversation>>, AppError> {
    let page = Pagination::from(params);
    let result = state
        .conversations
        .list(auth.company_id, auth.user_id, page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    title: Option<String>,
}

fn conversation_title(raw: Option<&str>) -> String {
    non_blank(raw)
        .map(|t| t.chars().take(MAX_TITLE_CHARS).collect())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    body: Option<Json<CreateConversationRequest>>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let conversation = state
        .conversations
        .create(&NewConversation {
            id: Uuid::new_v4(),
            company_id: auth.company_id,
            user_id: auth.user_id,
            title: conversation_title(req.title.as_deref()),
        })
        .await?;

    info!(company_id = %auth.company_id, conversation_id = %conversation.id, "Conversation created");
    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn find(
    state: &AppState,
    auth: &AuthenticatedUser,
    conversation_id: Uuid,
) -> Result<Conversation, AppError> {
    state
        .conversations
        .get(auth.company_id, auth.user_id, conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Conversation>, AppError> {
    find(&state, &auth, conversation_id).await.map(Json)
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, AppError> {
    find(&state, &auth, conversation_id).await?;
    Ok(Json(
        state
            .conversations
            .messages(auth.company_id, conversation_id)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    content: String,
}

/// Chat inside an existing conversation
pub async fn post_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    find(&state, &auth, conversation_id).await?;
    check_rate_limit(&state, &auth)?;

    let reply = state
        .chat
        .send(auth.company_id, auth.user_id, &req.content, Some(conversation_id))
        .await?;
    Ok(Json(reply.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_default_and_truncate() {
        assert_eq!(conversation_title(None), DEFAULT_TITLE);
        assert_eq!(conversation_title(Some("  ")), DEFAULT_TITLE);
        let long = "x".repeat(300);
        assert_eq!(conversation_title(Some(&long)).chars().count(), MAX_TITLE_CHARS);
    }
}
