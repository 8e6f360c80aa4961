//! `codecoach chat`: Ask the coach from the terminal.
//!
//! The conversation history lives in this process only; every turn sends the
//! full transcript, the same way a browser client would.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use codecoach_agent::CoachAgent;
use codecoach_config::AppConfig;
use codecoach_core::{ChatMessage, ChatRequest};
use codecoach_providers::OpenAiCompatProvider;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    lesson: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    let agent = CoachAgent::from_config(provider, &config);

    if let Some(msg) = message {
        let request = build_request(vec![ChatMessage::user(msg)], lesson.as_deref());

        eprint!("  Thinking...");
        let response = agent.respond(request).await;
        eprint!("\r              \r");
        println!("{}", response?.content);
        return Ok(());
    }

    println!();
    println!("  Code Coach: interactive mode");
    println!("  Model:   {}", config.model);
    if let Some(lesson) = &lesson {
        println!("  Lesson:  {lesson}");
    }
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        history.push(ChatMessage::user(line));
        debug!(turns = history.len(), "Sending transcript");
        let request = build_request(history.clone(), lesson.as_deref());

        match agent.respond(request).await {
            Ok(response) => {
                println!();
                for text in response.content.lines() {
                    println!("  Coach > {text}");
                }
                println!();
                history.push(ChatMessage::assistant(response.content));
            }
            Err(e) => {
                // Drop the unanswered turn so the next one starts clean
                history.pop();
                tracing::warn!(error = %e, class = e.class(), "Chat turn failed");
                eprintln!("  [{}] {e}", e.class());
                println!();
            }
        }
    }

    println!();
    Ok(())
}

fn build_request(messages: Vec<ChatMessage>, lesson: Option<&str>) -> ChatRequest {
    let request = ChatRequest::new(messages);
    match lesson {
        Some(lesson) => request.with_context("current_lesson", lesson),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_becomes_context() {
        let request = build_request(vec![ChatMessage::user("hi")], Some("Optionals"));
        let context = request.context.unwrap();
        assert_eq!(context["current_lesson"], "Optionals");
    }

    #[test]
    fn no_lesson_means_no_context() {
        let request = build_request(vec![ChatMessage::user("hi")], None);
        assert!(request.context.is_none());
    }
}
