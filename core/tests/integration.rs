//! Claims lifecycle against the live mock server, host-does-IO style.
//!
//! # Design
//! Starts the mock server on a random port, then drives `ApiClient` over real
//! HTTP using ureq: build a request, attach the bearer token, execute, parse.
//! Validates that request building and envelope parsing agree with the server.

use claims_core::middleware::attach_auth;
use claims_core::{
    ApiClient, ApiError, Claim, ClaimStatus, ClaimSubmission, Document, FilePart, Files, HttpMethod,
    HttpRequest, HttpResponse, PageRequest, PagedResponse, RequestConfig, Sort,
};

const TOKEN: &str = "integration-token";

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let result = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Delete => {
            let mut builder = agent.delete(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post | HttpMethod::Put => {
            let mut builder = if req.method == HttpMethod::Post {
                agent.post(&req.url)
            } else {
                agent.put(&req.url)
            };
            for (name, value) in &req.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let body = req.body.unwrap_or_default();
            builder.send(&body[..])
        }
    };
    let mut response = result.expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_vec().unwrap_or_default();

    HttpResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

fn start_server(claims: usize) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            let state = mock_server::AppState::new(TOKEN, mock_server::sample_claims(claims));
            mock_server::run(listener, state).await
        })
        .unwrap();
    });

    format!("http://{addr}/api")
}

fn send(req: HttpRequest) -> HttpResponse {
    execute(attach_auth(req, Some(TOKEN)))
}

#[test]
fn claims_lifecycle() {
    // Step 1: start mock server on a random port.
    let client = ApiClient::new(&start_server(0));
    let none = RequestConfig::new();

    // Step 2: first page is empty.
    let req = client.build_paginated("/claims", &PageRequest::default()).unwrap();
    let page: PagedResponse<Claim> = client.parse_paginated(send(req)).unwrap();
    assert!(page.content.is_empty(), "expected empty list");
    assert_eq!(page.metadata.total_pages, 0);

    // Step 3: submit a claim.
    let submission = ClaimSubmission {
        policy_id: "POL-042".to_string(),
        incident_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        description: "Burst pipe".to_string(),
        amount: 780.0,
    };
    let req = client.build_post("/claims", &submission, &none).unwrap();
    let created: Claim = client.parse(send(req)).unwrap();
    assert_eq!(created.policy_id, "POL-042");
    assert_eq!(created.status, ClaimStatus::Submitted);
    let id = created.id.clone();

    // Step 4: fetch it back.
    let req = client.build_get(&format!("/claims/{id}"), &none).unwrap();
    let fetched: Claim = client.parse(send(req)).unwrap();
    assert_eq!(fetched, created);

    // Step 5: update status.
    let req = client
        .build_put(
            &format!("/claims/{id}"),
            &serde_json::json!({"status": "UNDER_REVIEW"}),
            &none,
        )
        .unwrap();
    let updated: Claim = client.parse(send(req)).unwrap();
    assert_eq!(updated.status, ClaimStatus::UnderReview);
    assert_eq!(updated.description, "Burst pipe");

    // Step 6: attach two documents.
    let files = Files::from(vec![
        FilePart::new("invoice.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
        FilePart::new("photo.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0x00]),
    ]);
    let extra = vec![("claimId".to_string(), id.clone())];
    let req = client
        .build_upload(&format!("/claims/{id}/documents"), &files, &extra)
        .unwrap();
    let docs: Vec<Document> = client.parse(send(req)).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].size, 4);

    // Step 7: delete.
    let req = client.build_delete(&format!("/claims/{id}"), &none).unwrap();
    let () = client.parse(send(req)).unwrap();

    // Step 8: fetch after delete is NotFound.
    let req = client.build_get(&format!("/claims/{id}"), &none).unwrap();
    let err = client.parse::<Claim>(send(req)).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
fn pages_of_23_claims_at_size_10() {
    let client = ApiClient::new(&start_server(23));
    let mut ids = Vec::new();
    for page in 0..3 {
        let req = client
            .build_paginated("/claims", &PageRequest::new(page, 10))
            .unwrap();
        let resp: PagedResponse<Claim> = client.parse_paginated(send(req)).unwrap();
        assert_eq!(resp.metadata.total_pages, 3);
        assert_eq!(resp.metadata.total_elements, 23);
        if page == 2 {
            assert_eq!(resp.content.len(), 3);
        }
        ids.extend(resp.content.into_iter().map(|c| c.id));
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 23);
}

#[test]
fn sorted_page_comes_back_in_order() {
    let client = ApiClient::new(&start_server(6));
    let req = client
        .build_paginated("/claims", &PageRequest::new(0, 3).sorted(Sort::desc("amount")))
        .unwrap();
    let resp: PagedResponse<Claim> = client.parse_paginated(send(req)).unwrap();
    let amounts: Vec<f64> = resp.content.iter().map(|c| c.amount).collect();
    assert_eq!(amounts, vec![600.0, 500.0, 400.0]);
}

#[test]
fn missing_token_is_auth_expired() {
    let client = ApiClient::new(&start_server(1));
    let req = client.build_get("/claims/CLM-0001", &RequestConfig::new()).unwrap();
    let err = client.parse::<Claim>(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::AuthExpired));
}

#[test]
fn invalid_submission_exposes_field_errors() {
    let client = ApiClient::new(&start_server(0));
    let submission = ClaimSubmission {
        policy_id: "POL-1".to_string(),
        incident_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        description: "Zero".to_string(),
        amount: 0.0,
    };
    let req = client
        .build_post("/claims", &submission, &RequestConfig::new())
        .unwrap();
    let err = client.parse::<Claim>(send(req)).unwrap_err();
    assert_eq!(err.status(), Some(400));
    let details = err.validation_details().unwrap();
    assert_eq!(details.errors.keys().collect::<Vec<_>>(), vec!["amount"]);
}
