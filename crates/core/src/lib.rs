//! # Code Coach Core
//!
//! Domain types, traits, and error definitions for the Code Coach chat relay.
//! This crate has **no framework dependencies**: it defines the request and
//! response model that the assembler, the model gateway and the HTTP layer
//! all agree on.
//!
//! The model gateway is expressed as the [`Provider`] trait so the HTTP
//! layer and tests can swap in stub implementations.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ValidationError};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
