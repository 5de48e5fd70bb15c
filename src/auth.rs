//! Identity: Bearer tokens are verified against the auth collaborator;
//! the `X-User-ID` header is trusted as an opaque id (the mobile clients
//! send it); everything else is anonymous.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_ID_HEADER: &str = "x-user-id";

/// Error texts double as the client-facing detail messages.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    Missing,
    #[error("Invalid or expired token")]
    Invalid,
    #[error("auth transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a Bearer token, returning the user id it belongs to.
    async fn verify(&self, token: &str) -> Result<String, AuthError>;
}

pub type SharedVerifier = Arc<dyn TokenVerifier>;

/// Supabase GoTrue verifier: the user's own JWT authenticates the request.
pub struct SupabaseVerifier {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseVerifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ayush-assistant/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        let base: String = base_url.into();
        Self {
            http,
            base_url: base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for SupabaseVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        #[derive(Deserialize)]
        struct UserRow {
            id: String,
        }
        let resp = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::Invalid);
        }
        let user: UserRow = resp.json().await.map_err(|_| AuthError::Invalid)?;
        Ok(user.id)
    }
}

/// Fixed token map for tests.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
}

impl StaticVerifier {
    pub fn with_token(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::default().add(token, user_id)
    }

    pub fn add(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::Invalid)
    }
}

/// Verifier for deployments without an auth backend; Bearer tokens are
/// always rejected, `X-User-ID` identification still works.
pub struct DisabledVerifier;

#[async_trait]
impl TokenVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<String, AuthError> {
        Err(AuthError::Invalid)
    }
}

/// Resolve the caller's identity, if any. A present Bearer token must
/// verify; it is not silently downgraded to anonymous.
pub async fn resolve_identity(
    headers: &HeaderMap,
    verifier: &dyn TokenVerifier,
) -> Result<Option<String>, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let raw = value.to_str().map_err(|_| AuthError::Invalid)?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
        return verifier.verify(token).await.map(Some);
    }
    if let Some(value) = headers.get(USER_ID_HEADER) {
        let id = value.to_str().map_err(|_| AuthError::Invalid)?;
        if !id.is_empty() {
            return Ok(Some(id.to_string()));
        }
    }
    Ok(None)
}

/// Like [`resolve_identity`], but anonymous callers are an error.
pub async fn require_identity(
    headers: &HeaderMap,
    verifier: &dyn TokenVerifier,
) -> Result<String, AuthError> {
    resolve_identity(headers, verifier)
        .await?
        .ok_or(AuthError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[tokio::test]
    async fn bearer_token_is_verified() {
        let verifier = StaticVerifier::with_token("jwt-1", "user-1");
        let headers = headers(&[("authorization", "Bearer jwt-1")]);
        let id = resolve_identity(&headers, &verifier).await.unwrap();
        assert_eq!(id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn bad_bearer_token_is_an_error_not_anonymous() {
        let verifier = StaticVerifier::default();
        let headers = headers(&[
            ("authorization", "Bearer nope"),
            ("x-user-id", "user-2"),
        ]);
        let err = resolve_identity(&headers, &verifier).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid));
    }

    #[tokio::test]
    async fn user_id_header_is_trusted_when_no_bearer() {
        let verifier = DisabledVerifier;
        let headers = headers(&[("x-user-id", "user-3")]);
        let id = resolve_identity(&headers, &verifier).await.unwrap();
        assert_eq!(id.as_deref(), Some("user-3"));
    }

    #[tokio::test]
    async fn no_headers_is_anonymous() {
        let verifier = DisabledVerifier;
        let id = resolve_identity(&HeaderMap::new(), &verifier).await.unwrap();
        assert!(id.is_none());

        let err = require_identity(&HeaderMap::new(), &verifier)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Missing));
    }
}
