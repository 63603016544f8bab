//! Wire payloads exchanged with the dashboard API.
//!
//! Field names follow the server's JSON exactly. The user record is kept
//! opaque: the session layer only checks that one was returned.

pub mod auth;

pub use auth::{
    ErrorBody, LoginRequest, RefreshResponse, RegisterRequest, TokenResponse, UserRecord,
};
