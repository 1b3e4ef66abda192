use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "dev-token";

/// Every response body is wrapped in this envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Submitted,
    DocumentRequested,
    UnderReview,
    Accepted,
    Rejected,
    Paid,
}

const STATUSES: [ClaimStatus; 6] = [
    ClaimStatus::Submitted,
    ClaimStatus::DocumentRequested,
    ClaimStatus::UnderReview,
    ClaimStatus::Accepted,
    ClaimStatus::Rejected,
    ClaimStatus::Paid,
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    pub policy_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub claim_date: NaiveDate,
    pub incident_date: NaiveDate,
    pub status: ClaimStatus,
    pub description: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmission {
    pub policy_id: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct ClaimUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<ClaimStatus>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub claim_id: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub metadata: PageMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub status: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub errors: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

pub struct AppState {
    token: String,
    claims: RwLock<Vec<Claim>>,
    documents: RwLock<Vec<Document>>,
}

pub type Db = Arc<AppState>;

impl AppState {
    pub fn new(token: impl Into<String>, claims: Vec<Claim>) -> Db {
        Arc::new(Self {
            token: token.into(),
            claims: RwLock::new(claims),
            documents: RwLock::new(Vec::new()),
        })
    }
}

/// `count` deterministic claims, `CLM-0001` upwards, one day apart from
/// 2024-01-01 and with amounts of 100, 200, 300, ...
pub fn sample_claims(count: usize) -> Vec<Claim> {
    const CUSTOMERS: [&str; 4] = ["Ada Lovelace", "Grace Hopper", "Alan Turing", "Edsger Dijkstra"];
    let base = DateTime::<Utc>::UNIX_EPOCH + Duration::days(19_723);
    (0..count)
        .map(|i| {
            let day = base + Duration::days(i as i64);
            Claim {
                id: format!("CLM-{:04}", i + 1),
                policy_id: format!("POL-{:03}", i % 7 + 1),
                customer_id: format!("CUS-{:03}", i % CUSTOMERS.len() + 1),
                customer_name: CUSTOMERS[i % CUSTOMERS.len()].to_string(),
                claim_date: day.date_naive(),
                incident_date: (day - Duration::days(3)).date_naive(),
                status: STATUSES[i % STATUSES.len()],
                description: format!("Sample claim {}", i + 1),
                amount: 100.0 * (i as f64 + 1.0),
                created_at: day,
                updated_at: day,
            }
        })
        .collect()
}

pub fn app() -> Router {
    app_with_state(AppState::new(DEFAULT_TOKEN, Vec::new()))
}

pub fn app_with_state(state: Db) -> Router {
    let api = Router::new()
        .route("/claims", get(list_claims).post(create_claim))
        .route(
            "/claims/{id}",
            get(get_claim).put(update_claim).delete(delete_claim),
        )
        .route("/claims/{id}/documents", post(upload_documents))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));
    Router::new().nest("/api", api).with_state(state)
}

pub async fn run(listener: TcpListener, state: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

/// Unreadable JSON bodies get the envelope too, keeping axum's status.
fn json_body<T>(input: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    input
        .map(|Json(value)| value)
        .map_err(|rejection| failure(rejection.status(), rejection.body_text()))
}

async fn require_bearer(State(state): State<Db>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(state.token.as_str()) {
        tracing::warn!(path = %request.uri().path(), "rejecting request without a valid token");
        return failure(StatusCode::UNAUTHORIZED, "authentication required");
    }
    next.run(request).await
}

fn sort_claims(claims: &mut [Claim], sort: &str) -> Result<(), String> {
    let (field, direction) = sort.split_once(',').unwrap_or((sort, "asc"));
    let descending = match direction.trim().to_ascii_lowercase().as_str() {
        "asc" => false,
        "desc" => true,
        other => return Err(format!("unknown sort direction `{other}`")),
    };
    match field.trim() {
        "id" => claims.sort_by(|a, b| a.id.cmp(&b.id)),
        "amount" => claims.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
        "claimDate" | "submissionDate" => claims.sort_by(|a, b| a.claim_date.cmp(&b.claim_date)),
        "customerName" => claims.sort_by(|a, b| a.customer_name.cmp(&b.customer_name)),
        other => return Err(format!("cannot sort by `{other}`")),
    }
    if descending {
        claims.reverse();
    }
    Ok(())
}

async fn list_claims(
    State(db): State<Db>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<PagedResponse<Claim>>>, Response> {
    let Query(params) =
        params.map_err(|rejection| failure(rejection.status(), rejection.body_text()))?;
    let page = params.page.unwrap_or(0);
    let size = params.size.unwrap_or(10);
    if size == 0 {
        return Err(failure(StatusCode::BAD_REQUEST, "size must be greater than 0"));
    }

    let mut claims = db.claims.read().await.clone();
    if let Some(sort) = params.sort.as_deref() {
        sort_claims(&mut claims, sort).map_err(|e| failure(StatusCode::BAD_REQUEST, e))?;
    }

    let total = claims.len() as u64;
    let content: Vec<Claim> = claims
        .into_iter()
        .skip(page as usize * size as usize)
        .take(size as usize)
        .collect();
    Ok(Json(Envelope::ok(PagedResponse {
        content,
        metadata: PageMetadata {
            page,
            size,
            total_elements: total,
            total_pages: total.div_ceil(u64::from(size)),
        },
    })))
}

async fn get_claim(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Claim>>, Response> {
    let claims = db.claims.read().await;
    claims
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .map(|c| Json(Envelope::ok(c)))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("claim {id} not found")))
}

fn validate_submission(input: &ClaimSubmission) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    if input.policy_id.trim().is_empty() {
        errors.insert("policyId".to_string(), "must not be blank".to_string());
    }
    if input.description.trim().is_empty() {
        errors.insert("description".to_string(), "must not be blank".to_string());
    }
    if input.amount <= 0.0 {
        errors.insert("amount".to_string(), "must be greater than 0".to_string());
    }
    errors
}

async fn create_claim(
    State(db): State<Db>,
    input: Result<Json<ClaimSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Claim>>), Response> {
    let input = json_body(input)?;
    let errors = validate_submission(&input);
    if !errors.is_empty() {
        let body = ValidationErrorResponse {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: "Validation failed".to_string(),
            timestamp: Utc::now(),
            errors,
        };
        return Err((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let now = Utc::now();
    let claim = Claim {
        id: format!("CLM-{}", Uuid::new_v4().simple()),
        policy_id: input.policy_id,
        customer_id: "CUS-001".to_string(),
        customer_name: "Ada Lovelace".to_string(),
        claim_date: now.date_naive(),
        incident_date: input.incident_date,
        status: ClaimStatus::Submitted,
        description: input.description,
        amount: input.amount,
        created_at: now,
        updated_at: now,
    };
    db.claims.write().await.push(claim.clone());
    tracing::info!(id = %claim.id, "claim created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(claim))))
}

async fn update_claim(
    State(db): State<Db>,
    Path(id): Path<String>,
    input: Result<Json<ClaimUpdate>, JsonRejection>,
) -> Result<Json<Envelope<Claim>>, Response> {
    let input = json_body(input)?;
    let mut claims = db.claims.write().await;
    let claim = claims
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("claim {id} not found")))?;
    if let Some(description) = input.description {
        claim.description = description;
    }
    if let Some(amount) = input.amount {
        claim.amount = amount;
    }
    if let Some(status) = input.status {
        claim.status = status;
    }
    claim.updated_at = Utc::now();
    Ok(Json(Envelope::ok(claim.clone())))
}

async fn delete_claim(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, Response> {
    let mut claims = db.claims.write().await;
    let before = claims.len();
    claims.retain(|c| c.id != id);
    if claims.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, format!("claim {id} not found")));
    }
    db.documents.write().await.retain(|d| d.claim_id != id);
    Ok(Json(Envelope::ok(())))
}

/// Accepts `file` / `files` parts; any other text field is checked against
/// the path when it names the claim.
async fn upload_documents(
    State(db): State<Db>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Envelope<Vec<Document>>>), Response> {
    if !db.claims.read().await.iter().any(|c| c.id == id) {
        return Err(failure(StatusCode::NOT_FOUND, format!("claim {id} not found")));
    }

    let mut uploaded = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?;

        match (name.as_str(), file_name) {
            ("file" | "files", Some(file_name)) => {
                let doc_id = Uuid::new_v4();
                uploaded.push(Document {
                    id: doc_id.to_string(),
                    claim_id: id.clone(),
                    url: format!("/api/claims/{id}/documents/{doc_id}"),
                    name: file_name,
                    content_type,
                    size: bytes.len() as u64,
                    uploaded_at: Utc::now(),
                });
            }
            ("claimId", None) if &bytes[..] != id.as_bytes() => {
                return Err(failure(
                    StatusCode::BAD_REQUEST,
                    "claimId field does not match the path",
                ));
            }
            _ => {}
        }
    }

    if uploaded.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "no files in upload"));
    }
    db.documents.write().await.extend(uploaded.iter().cloned());
    tracing::info!(claim = %id, count = uploaded.len(), "documents uploaded");
    Ok((StatusCode::CREATED, Json(Envelope::ok(uploaded))))
}
