//! Async access layer: typed verbs over a `Transport`.
//!
//! # Design
//! Every call runs the same pipeline: build the request with `ApiClient`,
//! `attach_auth`, execute, `check_status`, decode the envelope. A 401 on any
//! verb clears the `TokenStore` and fires the `LoginRedirect`. Failures are
//! logged with the failing path and handed back unchanged; there is no retry,
//! caching or request deduplication.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{LogRedirect, LoginRedirect, TokenStore};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::envelope::{decode_envelope, decode_paged, PagedResponse};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, RequestConfig};
use crate::middleware::{attach_auth, check_status};
use crate::multipart::Files;
use crate::pagination::PageRequest;
use crate::transport::{ReqwestTransport, Transport};

type Decoder<R> = fn(&[u8]) -> Result<R, ApiError>;

pub struct ApiService<T = ReqwestTransport> {
    client: ApiClient,
    transport: T,
    tokens: TokenStore,
    redirect: Arc<dyn LoginRedirect>,
    login_path: String,
}

impl ApiService<ReqwestTransport> {
    /// Service backed by a fresh `reqwest` client.
    pub fn from_config(config: &ClientConfig, tokens: TokenStore) -> Self {
        Self::new(config, ReqwestTransport::new(), tokens)
    }
}

impl<T: Transport> ApiService<T> {
    pub fn new(config: &ClientConfig, transport: T, tokens: TokenStore) -> Self {
        Self {
            client: ApiClient::new(&config.base_url),
            transport,
            tokens,
            redirect: Arc::new(LogRedirect),
            login_path: config.login_path.clone(),
        }
    }

    pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        config: &RequestConfig,
    ) -> Result<R, ApiError> {
        let request = self.client.build_get(path, config);
        self.call("fetch", path, request, decode_envelope::<R>).await
    }

    pub async fn post<R: DeserializeOwned, D: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &D,
        config: &RequestConfig,
    ) -> Result<R, ApiError> {
        let request = self.client.build_post(path, body, config);
        self.call("post", path, request, decode_envelope::<R>).await
    }

    pub async fn put<R: DeserializeOwned, D: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &D,
        config: &RequestConfig,
    ) -> Result<R, ApiError> {
        let request = self.client.build_put(path, body, config);
        self.call("update", path, request, decode_envelope::<R>).await
    }

    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        config: &RequestConfig,
    ) -> Result<R, ApiError> {
        let request = self.client.build_delete(path, config);
        self.call("delete", path, request, decode_envelope::<R>).await
    }

    /// Fetch one page of `path`. The returned page has already been checked
    /// against its metadata.
    pub async fn get_paginated<R: DeserializeOwned>(
        &self,
        path: &str,
        page: &PageRequest,
    ) -> Result<PagedResponse<R>, ApiError> {
        let request = self.client.build_paginated(path, page);
        self.call("fetch page", path, request, decode_paged::<R>).await
    }

    pub async fn upload_file<R: DeserializeOwned>(
        &self,
        path: &str,
        files: &Files,
        additional_data: &[(String, String)],
    ) -> Result<R, ApiError> {
        let request = self.client.build_upload(path, files, additional_data);
        self.call("upload", path, request, decode_envelope::<R>).await
    }

    async fn call<R>(
        &self,
        action: &'static str,
        path: &str,
        request: Result<HttpRequest, ApiError>,
        decode: Decoder<R>,
    ) -> Result<R, ApiError> {
        let result = match request {
            Ok(request) => match self.execute(request).await {
                Ok(response) => decode(&response.body),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            tracing::error!(action, path, error = %err, "api request failed");
        }
        result
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let token = self.tokens.get().await;
        let request = attach_auth(request, token.as_deref());
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            authenticated = token.is_some(),
            "sending request"
        );

        let response = self.transport.execute(request).await?;
        match check_status(response) {
            Err(ApiError::AuthExpired) => {
                self.tokens.clear().await;
                self.redirect.redirect(&self.login_path);
                Err(ApiError::AuthExpired)
            }
            other => other,
        }
    }
}
