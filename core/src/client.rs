//! Stateless HTTP request builder and response parser for the claims API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse*` method that consumes an `HttpResponse`. The
//! caller executes the round-trip, either by hand or through `ApiService`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::envelope::{decode_envelope, decode_paged, PagedResponse};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestConfig};
use crate::middleware::check_status;
use crate::multipart::{Files, MultipartForm};
use crate::pagination::PageRequest;

const JSON: &str = "application/json";

/// Synchronous, stateless client for an envelope-speaking REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_get(&self, path: &str, config: &RequestConfig) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, path, config, None)
    }

    pub fn build_post<D: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &D,
        config: &RequestConfig,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, path, config, Some(to_json(body)?))
    }

    pub fn build_put<D: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &D,
        config: &RequestConfig,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Put, path, config, Some(to_json(body)?))
    }

    pub fn build_delete(
        &self,
        path: &str,
        config: &RequestConfig,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Delete, path, config, None)
    }

    /// GET `path` with `page`, `size` and optional `sort` query parameters.
    pub fn build_paginated(&self, path: &str, page: &PageRequest) -> Result<HttpRequest, ApiError> {
        page.validate()?;
        let config = RequestConfig {
            headers: Vec::new(),
            query: page.query_pairs(),
        };
        self.build_get(path, &config)
    }

    /// POST `files` and `additional_data` as `multipart/form-data`.
    pub fn build_upload(
        &self,
        path: &str,
        files: &Files,
        additional_data: &[(String, String)],
    ) -> Result<HttpRequest, ApiError> {
        let form = MultipartForm::encode(files, additional_data);
        let mut request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url(path, &[])?,
            headers: Vec::new(),
            body: None,
        };
        request.set_header("content-type", form.content_type());
        request.body = Some(form.into_body());
        Ok(request)
    }

    /// Check the status and return the envelope's `data` as `T`.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        let response = check_status(response)?;
        decode_envelope(&response.body)
    }

    pub fn parse_paginated<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<PagedResponse<T>, ApiError> {
        let response = check_status(response)?;
        decode_paged(&response.body)
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        config: &RequestConfig,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest, ApiError> {
        let mut request = HttpRequest {
            method,
            url: self.url(path, &config.query)?,
            headers: Vec::new(),
            body,
        };
        request.set_header("content-type", JSON);
        for (name, value) in &config.headers {
            request.set_header(name, value.clone());
        }
        Ok(request)
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<String, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }
}

fn to_json<D: Serialize + ?Sized>(body: &D) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|e| ApiError::Serialization(e.to_string()))
}
