//! Wire contract for single and paginated responses.
//!
//! Every endpoint answers with `{ "success": bool, "data": ..., "error"?: string }`.
//! Decoding is typed: `data` must deserialize into the caller's `T`, otherwise
//! the call fails with `ApiError::Deserialization` instead of handing back a
//! value of the wrong shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Standard response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Unwrap a raw envelope into the caller's type. `success: false` becomes
    /// `ApiError::Envelope` with the server's message.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Envelope(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        serde_json::from_value(self.data.unwrap_or(serde_json::Value::Null))
            .map_err(|e| ApiError::Deserialization(format!("unexpected data shape: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl PageMetadata {
    /// Metadata for `page` of a collection, deriving `total_pages`.
    pub fn new(page: u32, size: u32, total_elements: u64) -> Self {
        Self {
            page,
            size,
            total_elements,
            total_pages: total_pages(total_elements, size),
        }
    }
}

/// A page of items plus the metadata describing where it sits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> PagedResponse<T> {
    /// Check the page invariants: positive size, `content` no longer than
    /// `size`, and `total_pages == ceil(total_elements / size)`.
    pub fn validate(&self) -> Result<(), ApiError> {
        let meta = &self.metadata;
        if meta.size == 0 {
            return Err(ApiError::Deserialization(
                "page metadata has size 0".to_string(),
            ));
        }
        if self.content.len() as u64 > u64::from(meta.size) {
            return Err(ApiError::Deserialization(format!(
                "page holds {} items but size is {}",
                self.content.len(),
                meta.size
            )));
        }
        let expected = total_pages(meta.total_elements, meta.size);
        if meta.total_pages != expected {
            return Err(ApiError::Deserialization(format!(
                "totalPages is {} but {} elements at size {} make {expected}",
                meta.total_pages, meta.total_elements, meta.size
            )));
        }
        Ok(())
    }
}

/// `ceil(total_elements / size)`, or 0 for a zero size.
pub fn total_pages(total_elements: u64, size: u32) -> u64 {
    if size == 0 {
        return 0;
    }
    total_elements.div_ceil(u64::from(size))
}

/// Decode an envelope body and return its `data` as `T`.
///
/// A missing or `null` `data` is decoded from JSON `null`, so `()` and
/// `Option<_>` payloads work for endpoints that return nothing.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let envelope: ApiResponse<serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| ApiError::Deserialization(format!("malformed envelope: {e}")))?;
    envelope.into_result()
}

/// Decode a paginated envelope and check the page invariants.
pub fn decode_paged<T: DeserializeOwned>(body: &[u8]) -> Result<PagedResponse<T>, ApiError> {
    let page: PagedResponse<T> = decode_envelope(body)?;
    page.validate()?;
    Ok(page)
}
