//! Core library for compdash.
//!
//! Owns the client side of the dashboard's authenticated session: obtaining,
//! persisting, verifying and refreshing bearer credentials, and routing every
//! protected API call through [`SessionManager::request`] so an expired access
//! token is refreshed once and the call retried transparently.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use auth::{
    AuthError, Credential, FileStore, KeyringStore, MemoryStore, Session, SessionManager,
    SessionState, StoreError, TokenStore,
};
pub use config::{Config, StorageBackend};
pub use models::UserRecord;
