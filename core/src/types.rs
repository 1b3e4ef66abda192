//! Domain DTOs for the claims API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any drift between the two crates. They are payload
//! shapes only and carry no behaviour beyond serde.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an insurance claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Submitted,
    DocumentRequested,
    UnderReview,
    Accepted,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
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

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub policy_number: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub coverage_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// A file attached to a claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub claim_id: String,
    pub amount: f64,
    pub status: String,
    pub scheduled_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_date: Option<NaiveDate>,
    pub method: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

/// Request payload for submitting a new claim. Supporting documents go
/// through the multipart upload endpoint, not this body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmission {
    pub policy_id: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Body of a 400 response carrying per-field validation messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationErrorResponse {
    pub status: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}
