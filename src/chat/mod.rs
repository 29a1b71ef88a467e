//! Coach chat
//!
//! Thin client over a remote chat-completion API. The conversation
//! transcript lives with the caller; every send is a single opaque
//! request/response call.

pub mod client;

pub use client::{ChatClient, ChatError, ChatMessage, Conversation, Role};
