//! # mailgate core
//!
//! Domain types, traits, and error definitions for the mailgate assistant.
//! This crate performs **no I/O**; it defines the domain model that the
//! store backends, tools, providers and the orchestration engine implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the language-model inference boundary
//! - [`Tool`]: a side-effecting action executor
//! - [`DecisionStore`]: the namespaced key-value persistence contract
//!
//! Implementations live in their respective crates, so the orchestration
//! core can be exercised end-to-end with scripted doubles.

pub mod error;
pub mod event;
pub mod inbound;
pub mod message;
pub mod provider;
pub mod review;
pub mod run;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProtocolError, ProviderError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use inbound::{Disposition, InboundMessage};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition};
pub use review::{ActionRequest, ReviewOutcome, ReviewPermissions, ReviewRequest};
pub use run::{CompletionReason, Continuation, GateState, RunId, RunState, RunStatus};
pub use store::{DecisionStore, Namespace, StoredItem};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
