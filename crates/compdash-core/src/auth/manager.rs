//! Session lifecycle and the authenticated-request wrapper.
//!
//! One `SessionManager` lives for the whole process and is shared by
//! reference (typically behind an `Arc`). The session record sits in a
//! `watch` channel: writers update it synchronously, collaborators read it
//! or subscribe to changes. No lock is held across a network call, so
//! concurrent requests that all hit an expired token may each refresh
//! independently; a losing refresh fails and signs the session out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::models::{TokenResponse, UserRecord};

use super::store::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use super::{AuthError, Credential, Session, SessionState};

pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    session: watch::Sender<Session>,
    started: AtomicBool,
}

impl SessionManager {
    /// Create a manager hydrated from `store`, in the `Initializing` state.
    /// Call [`SessionManager::start`] (or use [`SessionManager::init`]) to
    /// verify any persisted token and become ready.
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        let credential = Credential {
            access_token: Self::load_entry(store.as_ref(), ACCESS_TOKEN_KEY),
            refresh_token: Self::load_entry(store.as_ref(), REFRESH_TOKEN_KEY),
        };
        debug!(?credential, "Session hydrated from storage");

        let (session, _) = watch::channel(Session {
            credential,
            ..Session::default()
        });

        Self {
            api,
            store,
            session,
            started: AtomicBool::new(false),
        }
    }

    /// Create a manager and run startup verification before returning it
    pub async fn init(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        let manager = Self::new(api, store);
        manager.start().await;
        manager
    }

    /// Resolve the initial session: verify a persisted access token against
    /// the identity endpoint, or settle as signed out when there is none.
    /// Any failure clears the session and its storage. Marks the session
    /// ready; later calls do nothing and return the current state.
    pub async fn start(&self) -> SessionState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let access_token = self.access_token();
        match access_token {
            None => debug!("No persisted access token"),
            Some(token) => match self.api.verify_token(&token).await {
                Ok(user) => {
                    info!("Persisted session verified");
                    self.session.send_modify(|s| {
                        s.user = Some(user);
                        s.authenticated_at = Some(Utc::now());
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Persisted token could not be verified, signing out");
                    self.logout();
                }
            },
        }

        self.session.send_modify(|s| s.ready = true);
        self.state()
    }

    // ===== Observable state =====

    /// Watch the session record for changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Snapshot of the session record
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.session.borrow().state()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.session.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    pub fn is_ready(&self) -> bool {
        self.session.borrow().ready
    }

    /// True until startup verification resolves
    pub fn loading(&self) -> bool {
        !self.is_ready()
    }

    pub fn access_token(&self) -> Option<String> {
        self.session.borrow().credential.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.session.borrow().credential.refresh_token.clone()
    }

    // ===== Session transitions =====

    /// Sign in with a username and password.
    ///
    /// On success the returned tokens are stored in memory and in persistent
    /// storage and the session becomes authenticated. On failure the
    /// existing session is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let result = self.api.login(username, password).await;
        self.establish(result, "Login")
    }

    /// Create an account and sign in to it in one step
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserRecord, AuthError> {
        let result = self.api.register(username, password, email).await;
        self.establish(result, "Registration")
    }

    fn establish(
        &self,
        result: Result<TokenResponse, AuthError>,
        action: &str,
    ) -> Result<UserRecord, AuthError> {
        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "{} failed", action);
                return Err(e);
            }
        };
        let Some(user) = tokens.user else {
            warn!("{} response carried no user record", action);
            return Err(AuthError::InvalidResponse(
                "response carried no user record".to_string(),
            ));
        };

        self.persist(ACCESS_TOKEN_KEY, &tokens.access_token);
        if let Some(ref refresh_token) = tokens.refresh_token {
            self.persist(REFRESH_TOKEN_KEY, refresh_token);
        }

        let record = user.clone();
        self.session.send_modify(move |s| {
            s.credential.access_token = Some(tokens.access_token);
            if let Some(refresh_token) = tokens.refresh_token {
                s.credential.refresh_token = Some(refresh_token);
            }
            s.user = Some(record);
            s.authenticated_at = Some(Utc::now());
        });

        info!("{} successful", action);
        Ok(user)
    }

    /// Drop the user and both tokens, in memory and in storage.
    /// Calling this while signed out does nothing.
    pub fn logout(&self) {
        let had_credentials = !self.session.borrow().credential.is_empty();
        self.session.send_modify(Session::clear);

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key = key, error = %e, "Failed to remove stored token");
            }
        }

        if had_credentials {
            info!("Signed out");
        }
    }

    /// Ask the server to revoke the access token, then [`logout`](Self::logout)
    /// whatever the server answered.
    pub async fn sign_out(&self) {
        if let Some(token) = self.access_token() {
            if let Err(e) = self.api.revoke(&token).await {
                warn!(error = %e, "Server-side logout failed");
            }
        }
        self.logout();
    }

    /// Replace the access token using the refresh token. Any failure signs
    /// the session out. Returns the new access token.
    async fn refresh(&self) -> Result<String, AuthError> {
        let Some(refresh_token) = self.refresh_token() else {
            warn!("No refresh token, signing out");
            self.logout();
            return Err(AuthError::CredentialMissing);
        };

        match self.api.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.persist(ACCESS_TOKEN_KEY, &refreshed.access_token);
                let token = refreshed.access_token.clone();
                self.session
                    .send_modify(move |s| s.credential.access_token = Some(token));
                info!("Access token refreshed");
                Ok(refreshed.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.logout();
                Err(e)
            }
        }
    }

    // ===== Authenticated requests =====

    /// Call a protected API path with the current access token.
    ///
    /// When the server answers 401 to a call that carried a token, the
    /// token is refreshed once and the call re-issued once with the new
    /// token; that second response is final whatever its status. If the
    /// refresh fails, the original 401 response is returned and the session
    /// is signed out. Transport failures are returned as errors.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        let sent_token = self.access_token();
        let response = self.dispatch(path, &options, sent_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || sent_token.is_none() {
            return Ok(response);
        }

        debug!(path = path, "Access token rejected, refreshing");
        let fresh_token = match self.refresh().await {
            Ok(token) => token,
            Err(_) => return Ok(response),
        };

        let retried = self.dispatch(path, &options, Some(&fresh_token)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(path = path, "Request still unauthorized after refresh");
        }
        Ok(retried)
    }

    /// [`request`](Self::request), then classify the status and decode a
    /// JSON body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(path, options).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", path, e))
        })
    }

    async fn dispatch(
        &self,
        path: &str,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .api
            .endpoint(options.method.clone(), path)
            .headers(options.headers_for(access_token)?);
        if let Some(ref body) = options.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    // ===== Storage =====

    fn load_entry(store: &dyn TokenStore, key: &str) -> Option<String> {
        match store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read stored token");
                None
            }
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key = key, error = %e, "Failed to persist token");
        }
    }
}
