//! # CRMPilot Core
//!
//! Domain types, traits, and error definitions for the CRMPilot conversational
//! CRM assistant. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the LLM transport
//! (`ModelProvider`), the conversation store (`ConversationStore`), the remote
//! CRM (`CrmClient`), and the report writer (`ReportRenderer`).
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod crm;
pub mod error;
pub mod event;
pub mod markers;
pub mod provider;
pub mod report;
pub mod store;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use crm::{CrmClient, EntityKind, Record};
pub use error::{CrmError, Error, ProviderError, ReportError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use provider::{CompletionRequest, CompletionResponse, ModelProvider, ToolDefinition};
pub use report::ReportRenderer;
pub use store::{ConversationStore, UserId};
pub use tool::Tool;
pub use turn::{Role, ToolInvocation, Turn};
