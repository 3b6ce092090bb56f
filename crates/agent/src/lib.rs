//! The agentic loop controller.
//!
//! One `process_turn` call drives a complete exchange: load the user's
//! conversation window, converse with the model, dispatch the tool calls it
//! emits, and return the final text plus any generated file attachments.

pub mod prompt;
pub mod runner;

pub use runner::{AgentReply, AgentRunner, LoopParams};
