//! Domain value objects for the authorization server.

pub mod client;
pub mod token;

pub use client::{Client, GrantType, ResponseType};
pub use token::{IssuedToken, TokenInfo};
