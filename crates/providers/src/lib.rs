//! LLM provider implementations for Plugboard.
//!
//! All providers implement the `plugboard_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::{OpenAiCompatProvider, parse_completion};
