//! HTTP middleware for protected resources.
//!
//! - [`BearerAuth`] - extractor validating the request's bearer token
//! - `IntoResponse` for [`AuthError`](crate::AuthError) and
//!   [`ErrorResponse`](crate::oauth::ErrorResponse)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use ferrule_auth::middleware::BearerAuth;
//!
//! async fn me(BearerAuth(info): BearerAuth) -> String {
//!     format!("Hello, {}!", info.user_id.unwrap_or_default())
//! }
//!
//! let app = Router::new().route("/api/me", get(me)).with_state(oauth_state);
//! ```

pub mod auth;
pub mod error;

pub use auth::BearerAuth;
pub use error::no_store_headers;
