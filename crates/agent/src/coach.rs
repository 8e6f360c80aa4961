//! The chat orchestrator: assemble, call the provider once, normalize.

use std::sync::Arc;

use codecoach_config::AppConfig;
use codecoach_core::error::Result;
use codecoach_core::message::{ChatRequest, ChatResponse};
use codecoach_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

use crate::assembler::PromptAssembler;

/// Answers chat requests with a single upstream completion each.
///
/// Holds only immutable configuration, so one instance is shared by every
/// request handler.
pub struct CoachAgent {
    /// The model gateway
    provider: Arc<dyn Provider>,

    /// Prompt shaping rules
    assembler: PromptAssembler,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,
}

impl CoachAgent {
    /// Create a new agent with the default prompt rules.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            assembler: PromptAssembler::default(),
            model: model.into(),
            temperature,
            max_tokens: None,
        }
    }

    /// Create an agent from the startup configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.model, config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_assembler(PromptAssembler::from_config(&config.prompt))
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the prompt assembler.
    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Handle one chat request end to end.
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatResponse> {
        info!(
            user_id = request.user_id.as_deref().unwrap_or("-"),
            messages = request.messages.len(),
            "Handling chat request"
        );

        let messages = self
            .assembler
            .assemble(&request.messages, request.context.as_ref())?;

        debug!(
            assembled = messages.len(),
            provider = %self.provider.name(),
            model = %self.model,
            "Prompt assembled"
        );

        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .provider
            .complete(provider_request)
            .await
            .inspect_err(|e| warn!(error = %e, class = e.class(), "Completion failed"))?;

        Ok(response.into_chat_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecoach_core::error::{Error, ProviderError, ValidationError};
    use codecoach_core::message::{ChatMessage, Role};
    use codecoach_core::provider::{ProviderResponse, Usage};
    use std::sync::Mutex;

    /// Records the request it receives and answers with fixed text.
    struct RecordingProvider {
        reply: std::result::Result<String, ProviderError>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    impl RecordingProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                reply: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            let text = self.reply.clone()?;
            Ok(ProviderResponse {
                message: ChatMessage::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            })
        }
    }

    #[tokio::test]
    async fn respond_shapes_prompt_and_returns_reply() {
        let provider = Arc::new(RecordingProvider::replying("mocked reply"));
        let agent = CoachAgent::new(provider.clone(), "gpt-3.5-turbo", 0.7).with_max_tokens(900);

        let request = ChatRequest::new(vec![ChatMessage::user("hello")])
            .with_user_id("u1")
            .with_context("lesson", "Loops");
        let response = agent.respond(request).await.unwrap();

        assert_eq!(response.role, Role::Assistant);
        assert_eq!(response.content, "mocked reply");
        assert_eq!(response.raw_meta.unwrap()["model"], "mock-model");

        let seen = provider.seen.lock().unwrap();
        let sent = &seen[0];
        assert_eq!(sent.model, "gpt-3.5-turbo");
        assert_eq!(sent.max_tokens, Some(900));
        assert_eq!(sent.messages[0].role, Role::System);
        assert!(sent.messages[0].content.contains("Context: lesson: Loops"));
        assert_eq!(sent.messages[1], ChatMessage::user("hello"));
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_provider() {
        let provider = Arc::new(RecordingProvider::replying("unused"));
        let agent = CoachAgent::new(provider.clone(), "gpt-3.5-turbo", 0.7);

        let err = agent
            .respond(ChatRequest::new(vec![ChatMessage::system("only rules")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::NoUserMessage)
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_after_one_attempt() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::Transport(
            "connection refused".into(),
        )));
        let agent = CoachAgent::new(provider.clone(), "gpt-3.5-turbo", 0.7);

        let err = agent
            .respond(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err.class(), "transport_error");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn from_config_applies_model_parameters() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let mut config = AppConfig {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 128,
            ..AppConfig::default()
        };
        config.prompt.system_prompt = "You teach Rust.".into();

        let agent = CoachAgent::from_config(provider.clone(), &config);
        assert_eq!(agent.model(), "gpt-4o-mini");
        agent
            .respond(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap();

        let seen = provider.seen.lock().unwrap();
        assert!((seen[0].temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(seen[0].max_tokens, Some(128));
        assert_eq!(seen[0].messages[0].content, "You teach Rust.");
    }
}
