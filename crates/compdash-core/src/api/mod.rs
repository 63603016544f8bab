//! HTTP plumbing for the dashboard API.
//!
//! `ApiClient` knows the server's auth endpoints and how to address
//! protected paths under the configured base URL. It holds no credentials;
//! the session manager decides which token goes on each call.

pub mod client;
pub mod error;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::RequestOptions;
