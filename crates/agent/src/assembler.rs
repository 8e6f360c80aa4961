//! Prompt assembly: turns a caller's conversation into the exact message
//! sequence sent to the model.
//!
//! # Rules
//!
//! - The output always starts with a `system` message. A caller-supplied
//!   system message wins and is passed through untouched; otherwise one is
//!   synthesized from the base instruction plus any lesson context.
//! - All other messages keep their relative order.
//! - Only the most recent `max_turns` of them are kept, and each content is
//!   truncated to `max_content_chars` characters.
//!
//! Assembly is a pure function of its inputs.

use codecoach_config::PromptConfig;
use codecoach_core::error::ValidationError;
use codecoach_core::message::{ChatMessage, Role, validate_messages};
use serde_json::{Map, Value};

/// Builds the final message sequence for one completion call.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
    max_turns: usize,
    max_content_chars: usize,
}

impl PromptAssembler {
    /// Create an assembler with the given base instruction and the default
    /// history limits.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let defaults = PromptConfig::default();
        Self {
            system_prompt: system_prompt.into(),
            max_turns: defaults.max_turns,
            max_content_chars: defaults.max_content_chars,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_turns: config.max_turns,
            max_content_chars: config.max_content_chars,
        }
    }

    /// Keep at most `max` messages after the system prompt.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Truncate message contents to `max` characters.
    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The synthesized system instruction for `context`.
    pub fn system_instruction(&self, context: Option<&Map<String, Value>>) -> String {
        match context.and_then(render_context) {
            Some(rendered) => format!("{}\nContext: {rendered}", self.system_prompt),
            None => self.system_prompt.clone(),
        }
    }

    /// Assemble the ordered message sequence for the model.
    ///
    /// Fails when `messages` is empty, contains an empty content, or has no
    /// `user` message.
    pub fn assemble(
        &self,
        messages: &[ChatMessage],
        context: Option<&Map<String, Value>>,
    ) -> Result<Vec<ChatMessage>, ValidationError> {
        validate_messages(messages)?;

        let caller_system = messages.iter().position(|m| m.role == Role::System);

        let head = match caller_system {
            Some(index) => messages[index].clone(),
            None => ChatMessage::system(self.system_instruction(context)),
        };

        let turns: Vec<&ChatMessage> = messages
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != caller_system)
            .map(|(_, m)| m)
            .collect();
        let skip = turns.len().saturating_sub(self.max_turns);

        let mut assembled = Vec::with_capacity(1 + turns.len() - skip);
        assembled.push(head);
        assembled.extend(turns.into_iter().skip(skip).map(|m| ChatMessage {
            role: m.role,
            content: truncate_chars(&m.content, self.max_content_chars),
        }));

        Ok(assembled)
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

/// Render context entries as `key: value` pairs joined by `", "`.
///
/// Entries with falsy values (null, false, zero, empty string/array/object)
/// are skipped. Returns `None` when nothing is left.
pub fn render_context(context: &Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = context
        .iter()
        .filter(|(_, v)| is_truthy(v))
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}: {s}"),
            other => format!("{k}: {other}"),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
