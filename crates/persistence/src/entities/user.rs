//! User and single-use token entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{SingleUseToken, User, UserRole};

/// Database enum for user_role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRoleDb {
    Client,
    Professional,
    Administrator,
    Visitor,
}

impl From<UserRoleDb> for UserRole {
    fn from(db: UserRoleDb) -> Self {
        match db {
            UserRoleDb::Client => Self::Client,
            UserRoleDb::Professional => Self::Professional,
            UserRoleDb::Administrator => Self::Administrator,
            UserRoleDb::Visitor => Self::Visitor,
        }
    }
}

impl From<UserRole> for UserRoleDb {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Client => Self::Client,
            UserRole::Professional => Self::Professional,
            UserRole::Administrator => Self::Administrator,
            UserRole::Visitor => Self::Visitor,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRoleDb,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            password_hash: entity.password_hash,
            role: entity.role.into(),
            email_verified: entity.email_verified,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Row of the password_resets and email_verifications tables; both share
/// one shape.
#[derive(Debug, Clone, FromRow)]
pub struct SingleUseTokenEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<SingleUseTokenEntity> for SingleUseToken {
    fn from(entity: SingleUseTokenEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            token_hash: entity.token_hash,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            created_at: entity.created_at,
        }
    }
}
