//! Agent module - LLM logic, prompt engineering, and memory orchestration
//!
//! This module handles all AI-related functionality including:
//! - OpenAI-compatible chat completions client (OpenAI, OpenRouter)
//! - Prompt templates for the classification and reply calls
//! - Decoding of structured classification answers
//! - The per-turn memory orchestrator

mod client;
pub mod decision;
mod orchestrator;
pub mod prompts;
mod types;

pub use client::ChatClient;
pub use decision::{CreateDecision, DecodeError, DeleteDecision, RetrievalDecision};
pub use orchestrator::{
    MemoryOrchestrator, TurnReport, BRAIN_TROUBLE_REPLY, EMPTY_MESSAGE_REPLY, FORGET_FAILED_REPLY,
    GENERIC_ERROR_REPLY, SAVE_FAILED_REPLY,
};
pub use prompts::{PromptTemplate, Prompts};
pub use types::*;
