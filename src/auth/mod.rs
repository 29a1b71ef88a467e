//! Authentication
//!
//! Opaque email/password collaborator: sign-in and sign-up against a
//! remote identity service.

pub mod client;

pub use client::{AuthClient, AuthError, AuthSession};
