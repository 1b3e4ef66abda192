//! Out-of-order page responses: the last page *requested* wins, not the last
//! response to arrive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use claims_core::{
    ApiError, ApiService, ClientConfig, HttpRequest, HttpResponse, PagedListController,
    TokenStore, Transport,
};
use tokio::sync::{mpsc, oneshot};

/// Answers `?page=N` with a one-item page containing `N`. Pages with a gate
/// installed are held until the test releases them.
struct GatedTransport {
    gates: Mutex<HashMap<u32, oneshot::Receiver<()>>>,
    arrived: mpsc::UnboundedSender<u32>,
}

fn requested_page(request: &HttpRequest) -> u32 {
    url::Url::parse(&request.url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "page")
        .map(|(_, v)| v.parse().unwrap())
        .unwrap()
}

#[async_trait]
impl Transport for GatedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let page = requested_page(&request);
        let gate = self.gates.lock().unwrap().remove(&page);
        self.arrived.send(page).unwrap();
        if let Some(gate) = gate {
            gate.await.unwrap();
        }
        let body = format!(
            r#"{{"success":true,"data":{{"content":[{page}],
            "metadata":{{"page":{page},"size":10,"totalElements":30,"totalPages":3}}}}}}"#
        );
        Ok(HttpResponse::new(200, body))
    }
}

#[tokio::test]
async fn slow_first_page_does_not_overwrite_second() {
    let (release_page_0, gate) = oneshot::channel();
    let (arrived_tx, mut arrived) = mpsc::unbounded_channel();
    let transport = GatedTransport {
        gates: Mutex::new(HashMap::from([(0, gate)])),
        arrived: arrived_tx,
    };
    let svc = Arc::new(ApiService::new(
        &ClientConfig::new("http://api.test/api"),
        transport,
        TokenStore::new(),
    ));
    let list: PagedListController<u32, GatedTransport> = PagedListController::new(svc, "/claims");

    // Page 0 goes out and stalls in the transport.
    let first = tokio::spawn({
        let list = list.clone();
        async move { list.refresh().await }
    });
    assert_eq!(arrived.recv().await, Some(0));

    // Page 1 is issued afterwards and resolves immediately.
    assert!(list.go_to_page(1).await);
    assert_eq!(arrived.recv().await, Some(1));
    list.with_state(|s| {
        assert_eq!(s.rows(), &[1]);
        assert!(!s.is_loading());
    })
    .await;

    // Now page 0's response finally arrives and is discarded.
    release_page_0.send(()).unwrap();
    assert!(!first.await.unwrap());
    list.with_state(|s| {
        assert_eq!(s.rows(), &[1]);
        assert_eq!(s.page(), 1);
        assert!(!s.is_loading());
    })
    .await;
}

#[tokio::test]
async fn in_order_responses_are_all_applied() {
    let (arrived_tx, _arrived) = mpsc::unbounded_channel();
    let transport = GatedTransport {
        gates: Mutex::new(HashMap::new()),
        arrived: arrived_tx,
    };
    let svc = Arc::new(ApiService::new(
        &ClientConfig::new("http://api.test/api"),
        transport,
        TokenStore::new(),
    ));
    let list: PagedListController<u32, GatedTransport> = PagedListController::new(svc, "/claims");

    assert!(list.refresh().await);
    list.with_state(|s| assert_eq!(s.rows(), &[0])).await;
    for page in 1..3 {
        assert!(list.go_to_page(page).await);
        list.with_state(|s| assert_eq!(s.rows(), &[page])).await;
    }
}
