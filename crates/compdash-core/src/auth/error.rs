use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a login, registration, verification or refresh.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No refresh token available")]
    CredentialMissing,

    #[error("Authentication rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Message suitable for showing to the person signing in
    pub fn user_message(&self) -> String {
        match self {
            AuthError::CredentialMissing => "Not signed in".to_string(),
            AuthError::Rejected { message, .. } => message.clone(),
            AuthError::Transport(_) => "Network error".to_string(),
            AuthError::InvalidResponse(_) => "Invalid response from server".to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let rejected = AuthError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid username or password".to_string(),
        };
        assert_eq!(rejected.user_message(), "Invalid username or password");
        assert_eq!(rejected.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!rejected.is_transport());

        assert_eq!(AuthError::CredentialMissing.user_message(), "Not signed in");
        assert_eq!(AuthError::CredentialMissing.status(), None);
        assert_eq!(
            AuthError::InvalidResponse("eof".to_string()).user_message(),
            "Invalid response from server"
        );
    }
}
