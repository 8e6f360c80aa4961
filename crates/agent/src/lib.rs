//! Chat orchestration for Code Coach.
//!
//! A request flows through two steps:
//!
//! 1. **Assemble**: validate the caller's messages, make sure a system
//!    prompt leads the conversation, clip history ([`PromptAssembler`])
//! 2. **Complete**: one call to the configured provider, normalized into a
//!    `ChatResponse` ([`CoachAgent`])
//!
//! Nothing is kept between requests.

pub mod assembler;
pub mod coach;

pub use assembler::{PromptAssembler, render_context};
pub use coach::CoachAgent;
