//! Authentication module for managing the user session and its credentials.
//!
//! This module provides:
//! - `SessionManager`: the session lifecycle (startup verification, login,
//!   registration, logout, refresh) and the authenticated-request wrapper
//! - `Session`: the observable session record shared with collaborators
//! - `TokenStore`: durable storage for the access and refresh tokens, backed
//!   by the OS keychain, a private JSON file, or process memory

pub mod error;
pub mod manager;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use manager::SessionManager;
pub use session::{Credential, Session, SessionState};
pub use store::{
    FileStore, KeyringStore, MemoryStore, StoreError, TokenStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
