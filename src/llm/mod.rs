//! LLM integration module

pub mod client;
pub mod mock;
pub mod prompts;
pub mod response;

pub use client::{complete_structured, ImageAttachment, LlmClient, LlmRequest, OpenAiClient};
