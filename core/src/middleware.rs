//! Request and response middleware, applied in a fixed order on every call:
//! `attach_auth` on the way out, `check_status` on the way back.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Attach `Authorization: Bearer <token>` when a token is present.
/// A missing token leaves the request untouched.
pub fn attach_auth(mut request: HttpRequest, token: Option<&str>) -> HttpRequest {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        request.set_header("authorization", format!("Bearer {token}"));
    }
    request
}

/// Map non-2xx responses onto `ApiError`. 401 becomes `AuthExpired` so the
/// caller can drop its credential; 404 becomes `NotFound`.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    match response.status {
        401 => Err(ApiError::AuthExpired),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::Http {
            status,
            body: response.body_text(),
        }),
    }
}
