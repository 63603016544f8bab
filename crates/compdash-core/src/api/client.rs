//! API client for the dashboard's REST API.
//!
//! Covers the auth endpoints the session manager drives and exposes
//! [`ApiClient::endpoint`] for building calls to protected paths.

use std::time::Duration;

use reqwest::header::{HeaderValue, InvalidHeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::AuthError;
use crate::config::Config;
use crate::models::{
    ErrorBody, LoginRequest, RefreshResponse, RegisterRequest, TokenResponse, UserRecord,
};

use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const VERIFY_TOKEN_PATH: &str = "/auth/verify-token";
const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const REFRESH_PATH: &str = "/auth/refresh";
const LOGOUT_PATH: &str = "/auth/logout";

/// Fallback messages when a rejection carries no server-supplied text
const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const VERIFICATION_FAILED: &str = "Token verification failed";
const REFRESH_FAILED: &str = "Token refresh failed";
const LOGOUT_FAILED: &str = "Logout failed";

/// Build an `Authorization: Bearer` value, marked sensitive so it is
/// redacted from `Debug` output.
pub(crate) fn bearer(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

/// HTTP client bound to one API base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path; a missing leading slash is added
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Request builder for `path` with no headers attached
    pub fn endpoint(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    // ===== Auth endpoints =====

    /// Check an access token and fetch the identity it belongs to
    pub async fn verify_token(&self, access_token: &str) -> Result<UserRecord, AuthError> {
        debug!("Verifying access token");
        let response = self
            .endpoint(Method::GET, VERIFY_TOKEN_PATH)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::check_response(response, VERIFICATION_FAILED).await?;
        Self::decode(response).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let body = LoginRequest { username, password };
        self.exchange(LOGIN_PATH, &body, LOGIN_FAILED).await
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<TokenResponse, AuthError> {
        let body = RegisterRequest {
            username,
            password,
            email,
        };
        self.exchange(REGISTER_PATH, &body, REGISTRATION_FAILED).await
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        debug!("Requesting access token refresh");
        let response = self
            .endpoint(Method::POST, REFRESH_PATH)
            .bearer_auth(refresh_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response, REFRESH_FAILED).await?;
        Self::decode(response).await
    }

    /// Ask the server to revoke an access token
    pub async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .endpoint(Method::POST, LOGOUT_PATH)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        Self::check_response(response, LOGOUT_FAILED).await?;
        Ok(())
    }

    async fn exchange<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<TokenResponse, AuthError> {
        debug!(path = path, "Sending credentials");
        let response = self
            .endpoint(Method::POST, path)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response, fallback).await?;
        Self::decode(response).await
    }

    /// Pass a 2xx response through; turn anything else into a rejection
    /// carrying the server's message, or `fallback` when it gave none.
    async fn check_response(response: Response, fallback: &str) -> Result<Response, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| fallback.to_string());

        Err(AuthError::Rejected { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}
