use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity payload returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Value);

impl UserRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Username for display, when the server includes one
    pub fn display_name(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

/// Body of a successful login or registration.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `null` and a missing field both land here as `None`
    #[serde(default)]
    pub user: Option<UserRecord>,
}

#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Error body. Application routes answer `{"error": ...}`, while the JWT
/// layer in front of them answers `{"msg": ...}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        self.error.or(self.msg).filter(|m| !m.trim().is_empty())
    }
}
