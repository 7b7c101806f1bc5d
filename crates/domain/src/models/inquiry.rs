//! Inquiry and message domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Inquiry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    Open,
    Declined,
    Converted,
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquiryStatus::Open => write!(f, "OPEN"),
            InquiryStatus::Declined => write!(f, "DECLINED"),
            InquiryStatus::Converted => write!(f, "CONVERTED"),
        }
    }
}

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Client,
    Vendor,
    Admin,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Client => "client",
            SenderRole::Vendor => "vendor",
            SenderRole::Admin => "admin",
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable message in an inquiry thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub seq: i32,
    pub sender_role: SenderRole,
    pub sender_name: String,
    pub sender_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A client's conversation with a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_name: String,
    pub provider_id: Uuid,
    pub event_date: Option<NaiveDate>,
    pub status: InquiryStatus,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message about to be appended. Sender fields come from the caller.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_role: SenderRole,
    pub sender_name: String,
    pub sender_id: Uuid,
    pub text: String,
}

/// Data required to open an inquiry.
#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub from_user_id: Uuid,
    pub from_name: String,
    pub provider_id: Uuid,
    pub event_date: Option<NaiveDate>,
    pub first_message: NewMessage,
}

/// Request payload for opening an inquiry.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    pub provider_id: Uuid,

    #[validate(
        length(min = 1, max = 5000, message = "Message must be 1-5000 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub message: String,

    pub event_date: Option<NaiveDate>,
}

/// Request payload for appending a message.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AppendMessageRequest {
    #[validate(
        length(min = 1, max = 5000, message = "Message must be 1-5000 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub text: String,
}
