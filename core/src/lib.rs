//! API access layer for the insurance claims service.
//!
//! # Overview
//! Two ways in:
//! - `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//!   without touching the network (host-does-IO). The caller executes the
//!   round-trip.
//! - `ApiService` runs the full pipeline over a `Transport`: bearer-token
//!   injection, status mapping, 401 handling and envelope decoding.
//!
//! `PagedListController` sits on top of `ApiService` and keeps the state of a
//! server-paginated list, discarding responses that arrive out of order.
//!
//! # Design
//! - Every payload travels inside the `{ success, data, error }` envelope;
//!   decoding is typed and checked.
//! - The credential lives in an explicit `TokenStore`, not in global state.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod consumer;
pub mod envelope;
pub mod error;
pub mod http;
pub mod middleware;
pub mod multipart;
pub mod pagination;
pub mod service;
pub mod transport;
pub mod types;

pub use auth::{LogRedirect, LoginRedirect, TokenStore};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use consumer::{ClaimsList, FetchTicket, PagedList, PagedListController};
pub use envelope::{ApiResponse, PageMetadata, PagedResponse};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestConfig};
pub use multipart::{FilePart, Files};
pub use pagination::{PageRequest, Sort, SortDirection};
pub use service::ApiService;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    Claim, ClaimStatus, ClaimSubmission, Customer, Document, Notification, Payment, Policy,
    ValidationErrorResponse,
};
