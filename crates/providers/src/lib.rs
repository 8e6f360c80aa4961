//! Chat-completion provider implementations for Code Coach.
//!
//! All providers implement the `codecoach_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
