//! Culture and tradition tag entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::CultureTraditionTag;

/// Database row mapping for the culture_tradition_tags table.
#[derive(Debug, Clone, FromRow)]
pub struct CultureTagEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CultureTagEntity> for CultureTraditionTag {
    fn from(entity: CultureTagEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            slug: entity.slug,
            display_order: entity.display_order,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}
