//! AI chat assistant: model client, analytics tools and the chat loop

pub mod chat;
pub mod gemini;
pub mod model;
pub mod tools;

pub use chat::{ChatError, ChatReply, ChatService};
pub use gemini::GeminiClient;
pub use model::LanguageModel;
pub use tools::ToolRunner;
