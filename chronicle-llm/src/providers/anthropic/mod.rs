//! Anthropic (Claude) provider implementation
//!
//! This module provides Claude-based timeline generation over the Messages API.

pub mod client;
pub mod generation;
pub mod types;

pub use client::AnthropicClient;
pub use generation::AnthropicProvider;
