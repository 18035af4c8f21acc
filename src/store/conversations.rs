//! Chat conversations and their messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

/// Messages replayed to the model as context
pub const HISTORY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_starred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub component_props: Option<Value>,
    #[serde(default)]
    pub visualization: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub company_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub component: Option<String>,
    pub component_props: Option<Value>,
    pub visualization: Option<Value>,
    pub is_error: bool,
}

impl NewMessage {
    pub fn user(company_id: Uuid, conversation_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            company_id,
            role: MessageRole::User,
            content: content.into(),
            component: None,
            component_props: None,
            visualization: None,
            is_error: false,
        }
    }

    pub fn assistant(company_id: Uuid, conversation_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            ..Self::user(company_id, conversation_id, content)
        }
    }
}

#[derive(Serialize)]
struct Touch {
    last_accessed_at: DateTime<Utc>,
}

/// Conversation store operations. Conversations are private to the user
/// that started them.
#[derive(Clone)]
pub struct ConversationStore {
    client: SupabaseClient,
}

impl ConversationStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<Conversation>, u64), SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("user_id", user_id)
            .order("last_accessed_at", true)
            .paginate(page);
        self.client.get_page("conversations", &query).await
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("user_id", user_id)
            .eq("id", conversation_id);
        self.client.get_one("conversations", &query).await
    }

    pub async fn create(&self, conversation: &NewConversation) -> Result<Conversation, SupabaseError> {
        self.client.insert("conversations", conversation).await
    }

    pub async fn touch(&self, company_id: Uuid, conversation_id: Uuid) -> Result<(), SupabaseError> {
        let query = Query::for_company(company_id).eq("id", conversation_id);
        let _: Vec<Value> = self
            .client
            .update(
                "conversations",
                &query,
                &Touch {
                    last_accessed_at: Utc::now(),
                },
            )
            .await?;
        Ok(())
    }

    /// Messages in chronological order
    pub async fn messages(
        &self,
        company_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("conversation_id", conversation_id)
            .order("created_at", false);
        self.client.get("messages", &query).await
    }

    /// The most recent `limit` messages, oldest first
    pub async fn recent_messages(
        &self,
        company_id: Uuid,
        conversation_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Message>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("conversation_id", conversation_id)
            .order("created_at", true)
            .limit(limit);
        let mut messages: Vec<Message> = self.client.get("messages", &query).await?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn add_message(&self, message: &NewMessage) -> Result<Message, SupabaseError> {
        self.client.insert("messages", message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_message_builder() {
        let company = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let message = NewMessage::assistant(company, conversation, "Here you go");

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["conversation_id"], conversation.to_string());
        assert_eq!(json["is_error"], false);
    }

    #[test]
    fn stored_message_serializes_camel_case() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "conversation_id": Uuid::new_v4(),
            "role": "assistant",
            "content": "3 items are low on stock",
            "component": "reorderList",
            "component_props": {"items": []},
            "created_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["componentProps"]["items"], serde_json::json!([]));
        assert_eq!(json["isError"], false);
    }
}
