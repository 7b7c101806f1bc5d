//! Inquiry and message entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Inquiry, InquiryStatus, Message, SenderRole};

/// Database enum for inquiry_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "inquiry_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatusDb {
    Open,
    Declined,
    Converted,
}

impl From<InquiryStatusDb> for InquiryStatus {
    fn from(db: InquiryStatusDb) -> Self {
        match db {
            InquiryStatusDb::Open => Self::Open,
            InquiryStatusDb::Declined => Self::Declined,
            InquiryStatusDb::Converted => Self::Converted,
        }
    }
}

/// Database enum for sender_role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sender_role", rename_all = "lowercase")]
pub enum SenderRoleDb {
    Client,
    Vendor,
    Admin,
}

impl From<SenderRoleDb> for SenderRole {
    fn from(db: SenderRoleDb) -> Self {
        match db {
            SenderRoleDb::Client => Self::Client,
            SenderRoleDb::Vendor => Self::Vendor,
            SenderRoleDb::Admin => Self::Admin,
        }
    }
}

impl From<SenderRole> for SenderRoleDb {
    fn from(role: SenderRole) -> Self {
        match role {
            SenderRole::Client => Self::Client,
            SenderRole::Vendor => Self::Vendor,
            SenderRole::Admin => Self::Admin,
        }
    }
}

/// Database row mapping for the inquiries table.
#[derive(Debug, Clone, FromRow)]
pub struct InquiryEntity {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_name: String,
    pub provider_id: Uuid,
    pub event_date: Option<NaiveDate>,
    pub status: InquiryStatusDb,
    pub message_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InquiryEntity {
    /// Combines the row with its messages, already ordered by `seq`.
    pub fn into_inquiry(self, messages: Vec<MessageEntity>) -> Inquiry {
        Inquiry {
            id: self.id,
            from_user_id: self.from_user_id,
            from_name: self.from_name,
            provider_id: self.provider_id,
            event_date: self.event_date,
            status: self.status.into(),
            messages: messages.into_iter().map(Into::into).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Database row mapping for the inquiry_messages table.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
    pub seq: i32,
    pub sender_role: SenderRoleDb,
    pub sender_name: String,
    pub sender_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageEntity> for Message {
    fn from(entity: MessageEntity) -> Self {
        Self {
            seq: entity.seq,
            sender_role: entity.sender_role.into(),
            sender_name: entity.sender_name,
            sender_id: entity.sender_id,
            text: entity.text,
            created_at: entity.created_at,
        }
    }
}
