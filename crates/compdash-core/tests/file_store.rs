//! Integration tests for the on-disk token store.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use compdash_core::{ApiClient, FileStore, SessionManager, SessionState, StoreError, TokenStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_file_store_set_get_remove() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path().join("nested").join("tokens.json"));

    assert_eq!(store.get("token").unwrap(), None);
    assert!(!store.path().exists());

    store.set("token", "A1").unwrap();
    store.set("refresh_token", "R1").unwrap();
    assert!(store.path().exists());
    assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));

    store.remove("token").unwrap();
    assert_eq!(store.get("token").unwrap(), None);
    assert!(store.path().exists(), "file should remain while an entry is left");

    store.remove("refresh_token").unwrap();
    assert!(!store.path().exists(), "file should be deleted once empty");

    // Removing from an absent file is fine
    store.remove("refresh_token").unwrap();
}

#[cfg(unix)]
#[test]
fn test_file_store_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path().join("tokens.json"));
    store.set("token", "A1").unwrap();

    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_file_store_corrupt_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tokens.json");
    fs::write(&path, "not json").unwrap();

    let store = FileStore::new(&path);
    assert!(matches!(store.get("token"), Err(StoreError::Serde(_))));
}

#[tokio::test]
async fn test_corrupt_file_starts_signed_out() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tokens.json");
    fs::write(&path, "{").unwrap();

    let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
    let manager = SessionManager::init(api, Arc::new(FileStore::new(&path))).await;
    assert_eq!(manager.state(), SessionState::Unauthenticated);
}

#[test]
fn test_file_store_recovers_from_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tokens.json");

    // set replaces the unreadable contents
    fs::write(&path, "{").unwrap();
    let store = FileStore::new(&path);
    store.set("token", "A1").unwrap();
    assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));

    // remove deletes an unreadable file outright
    fs::write(&path, "not json").unwrap();
    store.remove("refresh_token").unwrap();
    assert!(!path.exists());
    assert_eq!(store.get("token").unwrap(), None);
}

#[tokio::test]
async fn test_login_over_corrupt_file_survives_restart() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let token_path = temp_dir.path().join("tokens.json");
    fs::write(&token_path, "{").unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "user": {"id": 1, "username": "alice"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/verify-token"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    {
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let manager = SessionManager::init(api, Arc::new(FileStore::new(&token_path))).await;
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        manager.login("alice", "pw").await.unwrap();
    }

    let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let manager = SessionManager::init(api, Arc::new(FileStore::new(&token_path))).await;
    assert_eq!(manager.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_logout_clears_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tokens.json");
    fs::write(&path, "{").unwrap();

    let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
    let manager = SessionManager::init(api, Arc::new(FileStore::new(&path))).await;
    manager.logout();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let token_path = temp_dir.path().join("tokens.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "user": {"id": 1, "username": "alice"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/verify-token"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "user_id": 1,
            "username": "alice"
        })))
        .expect(1)
        .mount(&server)
        .await;

    {
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let manager = SessionManager::init(api, Arc::new(FileStore::new(&token_path))).await;
        manager.login("alice", "pw").await.unwrap();
    }

    // A fresh process picks the session back up from disk
    let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let manager = SessionManager::init(api, Arc::new(FileStore::new(&token_path))).await;
    assert_eq!(manager.state(), SessionState::Authenticated);
    assert_eq!(manager.user().unwrap().display_name(), Some("alice"));
    assert_eq!(
        manager.session().credential.refresh_token.as_deref(),
        Some("R1")
    );

    manager.logout();
    assert!(!token_path.exists());
}
