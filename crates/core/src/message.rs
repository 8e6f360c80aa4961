//! Chat message, request and response types.
//!
//! These are the value objects that flow through the relay:
//! client sends a `ChatRequest` → assembler shapes its messages → gateway
//! calls the model → client receives a `ChatResponse`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, tutoring rules)
    System,
    /// The student
    User,
    /// The model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Inbound body of `POST /api/v1/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,

    /// Optional client identifier, used for logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Optional lesson/domain info (e.g. `current_lesson`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            user_id: None,
            context: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add one context entry, creating the context map if needed.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_messages(&self.messages)
    }
}

/// Check the request-level invariants on a message list.
///
/// The list must be non-empty, every message must carry content, and at
/// least one message must come from the user.
pub fn validate_messages(messages: &[ChatMessage]) -> Result<(), ValidationError> {
    if messages.is_empty() {
        return Err(ValidationError::EmptyMessages);
    }

    if let Some(index) = messages.iter().position(|m| m.content.is_empty()) {
        return Err(ValidationError::EmptyContent { index });
    }

    if !messages.iter().any(|m| m.role == Role::User) {
        return Err(ValidationError::NoUserMessage);
    }

    Ok(())
}

/// Outbound body of a successful chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Always `assistant`
    pub role: Role,

    pub content: String,

    /// Opaque upstream metadata (model name, token usage)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatResponse {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            raw_meta: None,
        }
    }
}
