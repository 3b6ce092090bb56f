//! LLM provider implementations for CRMPilot.
//!
//! One implementation covers the field: most hosted and local LLM services
//! expose an OpenAI-compatible `/chat/completions` endpoint, and CRMPilot
//! only needs non-streaming tool-calling completions.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
