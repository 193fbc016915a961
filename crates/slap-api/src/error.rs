use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// The full failure taxonomy of the API. Every handler returns this; the
/// status mapping lives in one place.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("image upload failed")]
    Upstream(#[source] anyhow::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Translate a store failure: a late unique-constraint violation on the
    /// username column is the check-then-write race losing, which is a
    /// Conflict from the caller's point of view, not a server fault.
    pub fn username_conflict_or_internal(err: anyhow::Error) -> Self {
        match err.downcast_ref::<rusqlite::Error>() {
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict("this @username is already taken".into())
            }
            _ => Self::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Detail stays in the server log; the Display strings for Upstream
        // and Internal are already generic.
        match &self {
            ApiError::Upstream(source) => error!("upstream image host failure: {:#}", source),
            ApiError::Internal(source) => error!("internal error: {:#}", source),
            _ => {}
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violations_become_conflicts() {
        let sqlite = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: users.username".into()),
        );
        let err = ApiError::username_conflict_or_internal(sqlite.into());
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn other_store_failures_stay_internal() {
        let err = ApiError::username_conflict_or_internal(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
