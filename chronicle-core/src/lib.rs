//! Chronicle Core - Entity Types
//!
//! Request/result data types, the error taxonomy and prompt construction.
//! This crate performs no I/O; providers and transport live in chronicle-llm.

pub mod error;
pub mod prompt;
pub mod timeline;

pub use error::{
    ChronicleError, ChronicleResult, ConfigError, ErrorKind, LlmError, ValidationError,
};
pub use prompt::{Prompt, PromptBuilder, EVENT_CATEGORIES};
pub use timeline::{
    FamousPerson, GenerationRequest, GenerationResult, TimelineEvent, BIRTH_DATE_FIELD,
};
