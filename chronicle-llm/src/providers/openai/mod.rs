//! OpenAI provider implementation
//!
//! This module provides GPT-based timeline generation over the Chat Completions API.

pub mod client;
pub mod generation;
pub mod types;

pub use client::OpenAIClient;
pub use generation::OpenAIProvider;
