//! Caller-supplied options for a protected API call.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;

use super::client::bearer;
use super::ApiError;

/// Method, extra headers and JSON body for [`crate::SessionManager::request`].
///
/// Options are reusable: the same value is used to build the original call
/// and the single retry that follows a token refresh.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::default().method(Method::POST)
    }

    pub fn put() -> Self {
        Self::default().method(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::default().method(Method::DELETE)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Headers for one attempt: a JSON content type unless the caller set
    /// their own, the caller's headers, then the bearer token if any.
    pub(crate) fn headers_for(&self, access_token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }
        if let Some(token) = access_token {
            headers.insert(header::AUTHORIZATION, bearer(token)?);
        }
        Ok(headers)
    }
}
