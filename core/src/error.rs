//! Error types for the claims API access layer.
//!
//! # Design
//! `AuthExpired` and `NotFound` get dedicated variants because callers act on
//! them directly: a 401 wipes the stored credential, a 404 means the record is
//! gone. Every other non-2xx response lands in `Http` with the raw status and
//! body. `Envelope` is the server saying `success: false` on a 2xx response.

use thiserror::Error;

use crate::types::ValidationErrorResponse;

/// Errors returned by the request builders, parsers and the async service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, TLS, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server returned 401; the stored credential is invalid or expired.
    #[error("authorization expired")]
    AuthExpired,

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The envelope decoded fine but reported `success: false`.
    #[error("request rejected by server: {0}")]
    Envelope(String),

    /// The response body did not match the expected envelope or payload type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The base URL or resource path could not be turned into a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid page request: {0}")]
    InvalidPageRequest(String),
}

impl ApiError {
    /// HTTP status carried by this error, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired => Some(401),
            ApiError::NotFound => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Field-level validation errors from a 400 response, if the body has them.
    pub fn validation_details(&self) -> Option<ValidationErrorResponse> {
        match self {
            ApiError::Http { status: 400, body } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}
