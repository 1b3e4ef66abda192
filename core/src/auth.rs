//! Credential holder and the login-redirect hook.
//!
//! `TokenStore` is cloned into whoever needs it: the login flow writes it,
//! `ApiService` reads it on every call and clears it on a 401.

use std::sync::Arc;

use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    pub async fn set(&self, token: impl Into<String>) {
        *self.inner.write().await = Some(token.into());
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    /// Drop the stored token. Called on logout and on any 401.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// Where the client goes when its credential is rejected.
pub trait LoginRedirect: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Default redirect: there is no browser to navigate, so record the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect(&self, location: &str) {
        tracing::warn!(location, "credential rejected, redirecting to login");
    }
}
