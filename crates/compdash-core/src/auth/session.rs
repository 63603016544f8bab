use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::UserRecord;

/// The access/refresh token pair.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

// Tokens never reach logs through Debug
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(token: &Option<String>) -> &'static str {
            if token.is_some() {
                "<redacted>"
            } else {
                "<none>"
            }
        }
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

impl Credential {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup verification has not resolved yet
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Observable session record.
///
/// `ready` flips to true once, when startup verification resolves, and
/// never reverts. A token without a user only exists while that
/// verification is in flight.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub credential: Credential,
    pub ready: bool,
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.credential.access_token.is_some() && self.user.is_some()
    }

    pub fn state(&self) -> SessionState {
        if !self.ready {
            SessionState::Initializing
        } else if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Drop the user and both tokens; readiness is kept
    pub(crate) fn clear(&mut self) {
        self.user = None;
        self.credential = Credential::default();
        self.authenticated_at = None;
    }
}
