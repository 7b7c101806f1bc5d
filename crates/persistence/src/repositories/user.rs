//! User repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{NewUser, User};
use domain::ports::{StoreResult, UserStore};

use crate::entities::{UserEntity, UserRoleDb};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, display_name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, display_name, password_hash, role, email_verified, is_active,
                      created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(UserRoleDb::from(user.role))
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(store_error)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, display_name, password_hash, role, email_verified, is_active,
                   created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, display_name, password_hash, role, email_verified, is_active,
                   created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }
}
