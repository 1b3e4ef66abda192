//! Client configuration read from the environment.

use std::env;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every resource path is joined onto.
    pub base_url: String,
    /// Location handed to `LoginRedirect` after a 401.
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `API_URL` and `LOGIN_PATH`, falling back to the defaults when unset
    /// or empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            base_url: read("API_URL", DEFAULT_API_URL),
            login_path: read("LOGIN_PATH", DEFAULT_LOGIN_PATH),
        }
    }
}
