//! Storage traits for clients and token records.
//!
//! The authorization core never persists anything itself. It talks to two
//! narrow ports:
//!
//! - [`ClientStore`] - registered client applications
//! - [`TokenStore`] - token records addressable by code, access or refresh
//!
//! # Implementations
//!
//! - [`MemoryClientStore`] - in-process client registry (this crate)
//! - `ferrule-auth-memory` - in-memory token store backend

pub mod client;
pub mod token;

pub use client::{ClientStore, MemoryClientStore};
pub use token::TokenStore;
