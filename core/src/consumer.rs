//! Paginated list state, as driven by a server-paginated data grid.
//!
//! # Design
//! Each fetch takes a `FetchTicket` stamped with a generation number. Only
//! the ticket from the most recent `begin_fetch` may update the rows, so a
//! slow response for an old page can never overwrite a newer one, whatever
//! order the responses arrive in.
//!
//! A failed fetch is logged and leaves the last good rows in place. The
//! error is not kept in the state.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::envelope::PagedResponse;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Sort, DEFAULT_PAGE_SIZE};
use crate::service::ApiService;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::Claim;

/// Page sizes offered to the viewer.
pub const PAGE_SIZE_OPTIONS: [u32; 4] = [5, 10, 25, 50];

pub const CLAIMS_PATH: &str = "/claims";
pub const CLAIMS_SORT_FIELD: &str = "submissionDate";

/// Proof that a fetch was started, and for which page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub page: u32,
    pub size: u32,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A fresh list counts as loading until its first fetch completes.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    rows: Vec<T>,
    total_elements: u64,
    page: u32,
    page_size: u32,
    loading: bool,
    generation: u64,
}

impl<T> Default for PagedList<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl<T> PagedList<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            total_elements: 0,
            page: 0,
            page_size,
            loading: true,
            generation: 0,
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Row count across all pages, as reported by the last accepted page.
    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true when the page actually changed.
    pub fn set_page(&mut self, page: u32) -> bool {
        let changed = self.page != page;
        self.page = page;
        changed
    }

    /// Only sizes from `PAGE_SIZE_OPTIONS` are accepted.
    pub fn set_page_size(&mut self, size: u32) -> Result<bool, ApiError> {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return Err(ApiError::InvalidPageRequest(format!(
                "page size {size} is not one of {PAGE_SIZE_OPTIONS:?}"
            )));
        }
        let changed = self.page_size != size;
        self.page_size = size;
        Ok(changed)
    }

    /// Mark the list as loading and issue a ticket for the current page.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            page: self.page,
            size: self.page_size,
        }
    }

    /// Apply the outcome of the fetch behind `ticket`.
    ///
    /// Returns false, leaving the state untouched, when a newer fetch has been
    /// started since. Otherwise loading is cleared; on success the rows and
    /// total are replaced, on failure the previous rows stay.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<PagedResponse<T>, ApiError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                latest = self.generation,
                page = ticket.page,
                "discarding stale page response"
            );
            return false;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.rows = page.content;
                self.total_elements = page.metadata.total_elements;
            }
            Err(err) => {
                tracing::error!(
                    page = ticket.page,
                    size = ticket.size,
                    error = %err,
                    "failed to load page"
                );
            }
        }
        true
    }
}

/// Binds a `PagedList` to a resource path and an `ApiService`.
pub struct PagedListController<R, T = ReqwestTransport> {
    service: Arc<ApiService<T>>,
    state: Arc<Mutex<PagedList<R>>>,
    path: String,
    sort: Option<Sort>,
}

impl<R, T> Clone for PagedListController<R, T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            state: Arc::clone(&self.state),
            path: self.path.clone(),
            sort: self.sort.clone(),
        }
    }
}

/// The claims grid: `/claims`, newest submissions first.
pub type ClaimsList<T = ReqwestTransport> = PagedListController<Claim, T>;

impl<T: Transport> PagedListController<Claim, T> {
    pub fn claims(service: Arc<ApiService<T>>) -> Self {
        Self::new(service, CLAIMS_PATH).sorted(Sort::desc(CLAIMS_SORT_FIELD))
    }
}

impl<R: DeserializeOwned, T: Transport> PagedListController<R, T> {
    pub fn new(service: Arc<ApiService<T>>, path: impl Into<String>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(PagedList::default())),
            path: path.into(),
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Run one fetch of the current page. Returns whether the response was
    /// applied; a stale response is dropped.
    pub async fn refresh(&self) -> bool {
        let ticket = self.state.lock().await.begin_fetch();
        let mut request = PageRequest::new(ticket.page, ticket.size);
        request.sort = self.sort.clone();

        let result = self.service.get_paginated(&self.path, &request).await;
        self.state.lock().await.complete(ticket, result)
    }

    /// Move to `page` and fetch it. Staying on the current page issues no
    /// request and returns false.
    pub async fn go_to_page(&self, page: u32) -> bool {
        if !self.state.lock().await.set_page(page) {
            return false;
        }
        self.refresh().await
    }

    /// Switch page size and refetch. An unchanged size issues no request.
    pub async fn change_page_size(&self, size: u32) -> Result<bool, ApiError> {
        if !self.state.lock().await.set_page_size(size)? {
            return Ok(false);
        }
        Ok(self.refresh().await)
    }

    /// Read the state under the lock.
    pub async fn with_state<O>(&self, f: impl FnOnce(&PagedList<R>) -> O) -> O {
        f(&*self.state.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::auth::TokenStore;
    use crate::config::ClientConfig;
    use crate::envelope::PageMetadata;
    use crate::http::{HttpRequest, HttpResponse};

    /// Answers every request with an empty page and counts the calls.
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for Counting {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(
                200,
                r#"{"success":true,"data":{"content":[],
                "metadata":{"page":0,"size":10,"totalElements":0,"totalPages":0}}}"#,
            ))
        }
    }

    fn controller() -> (Arc<AtomicUsize>, PagedListController<u32, Counting>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Counting {
            calls: Arc::clone(&calls),
        };
        let svc = Arc::new(ApiService::new(
            &ClientConfig::new("http://api.test/api"),
            transport,
            TokenStore::new(),
        ));
        (calls, PagedListController::new(svc, "/claims"))
    }

    fn page(items: Vec<u32>, page: u32, size: u32, total: u64) -> PagedResponse<u32> {
        PagedResponse {
            content: items,
            metadata: PageMetadata::new(page, size, total),
        }
    }

    #[test]
    fn successful_fetch_replaces_rows_and_total() {
        let mut list = PagedList::new(10);
        let ticket = list.begin_fetch();
        assert!(list.is_loading());
        assert!(list.complete(ticket, Ok(page(vec![1, 2, 3], 0, 10, 23))));
        assert!(!list.is_loading());
        assert_eq!(list.rows(), &[1, 2, 3]);
        assert_eq!(list.total_elements(), 23);
    }

    #[test]
    fn failure_keeps_last_good_rows_and_clears_loading() {
        let mut list = PagedList::new(10);
        let t1 = list.begin_fetch();
        list.complete(t1, Ok(page(vec![1, 2], 0, 10, 2)));

        let t2 = list.begin_fetch();
        assert!(list.complete(t2, Err(ApiError::Transport("refused".to_string()))));
        assert!(!list.is_loading());
        assert_eq!(list.rows(), &[1, 2]);
        assert_eq!(list.total_elements(), 2);
    }

    #[test]
    fn late_response_for_older_ticket_is_discarded() {
        let mut list = PagedList::new(10);
        let first = list.begin_fetch();
        list.set_page(1);
        let second = list.begin_fetch();
        assert_eq!(first.page, 0);
        assert_eq!(second.page, 1);

        assert!(list.complete(second, Ok(page(vec![11, 12], 1, 10, 12))));
        assert!(!list.complete(first, Ok(page(vec![1; 10], 0, 10, 12))));
        assert_eq!(list.rows(), &[11, 12]);
    }

    #[test]
    fn stale_completion_does_not_clear_loading() {
        let mut list = PagedList::<u32>::new(10);
        let first = list.begin_fetch();
        let _second = list.begin_fetch();
        assert!(!list.complete(first, Ok(page(vec![], 0, 10, 0))));
        assert!(list.is_loading());
    }

    #[test]
    fn generations_increase_monotonically() {
        let mut list = PagedList::<u32>::new(10);
        let a = list.begin_fetch();
        let b = list.begin_fetch();
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn page_size_must_be_an_offered_option() {
        let mut list = PagedList::<u32>::default();
        assert_eq!(list.page_size(), 10);
        assert!(list.set_page_size(25).unwrap());
        assert!(!list.set_page_size(25).unwrap());
        assert!(matches!(
            list.set_page_size(7),
            Err(ApiError::InvalidPageRequest(_))
        ));
        assert_eq!(list.page_size(), 25);
    }

    #[test]
    fn new_list_is_loading_until_first_fetch() {
        let mut list = PagedList::<u32>::default();
        assert!(list.is_loading());
        let ticket = list.begin_fetch();
        list.complete(ticket, Ok(page(vec![], 0, 10, 0)));
        assert!(!list.is_loading());
    }

    #[tokio::test]
    async fn unchanged_page_or_size_issues_no_request() {
        let (calls, list) = controller();
        assert!(list.refresh().await);
        assert!(!list.go_to_page(0).await);
        assert!(!list.change_page_size(10).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(list.go_to_page(1).await);
        assert!(list.change_page_size(25).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_page_size_issues_no_request() {
        let (calls, list) = controller();
        assert!(list.change_page_size(7).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        list.with_state(|s| assert_eq!(s.page_size(), 10)).await;
    }

    #[test]
    fn set_page_reports_change() {
        let mut list = PagedList::<u32>::default();
        assert!(!list.set_page(0));
        assert!(list.set_page(3));
        assert_eq!(list.page(), 3);
    }
}
