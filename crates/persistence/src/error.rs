//! Mapping of sqlx errors onto the domain store error.

use domain::ports::StoreError;

/// PostgreSQL SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Converts a sqlx error into a [`StoreError`].
///
/// Unique violations become `Conflict` carrying the constraint name.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            StoreError::Backend(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_other_errors_map_to_backend() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Backend(_)
        ));
    }
}
