use esync_store::StoreError;

/// Map a driver error onto the store taxonomy so callers can log a kind.
pub fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound(e.to_string()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // insufficient_privilege
            Some("42501") => StoreError::PermissionDenied(db.message().to_string()),
            // connection_exception class
            Some(code) if code.starts_with("08") => StoreError::Unavailable(db.message().to_string()),
            _ => StoreError::Rejected(db.message().to_string()),
        },
        _ => StoreError::Other(e.to_string()),
    }
}
