use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error taxonomy surfaced by handlers. Infrastructure failures stay in
/// `Internal` and are logged, never leaked to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Reset token is invalid or expired")]
    ResetTokenInvalid,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Translate a Postgres unique violation (SQLSTATE 23505) into a `Conflict`
/// naming the constrained field. Any other error code is not a conflict.
fn conflict_for(code: Option<&str>, constraint: Option<&str>) -> Option<ApiError> {
    if code != Some("23505") {
        return None;
    }
    let field = match constraint {
        Some(c) if c.contains("email") => "email",
        Some(c) if c.contains("cnic") => "cnic",
        _ => "record",
    };
    Some(ApiError::Conflict(format!("{field} already registered")))
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if let Some(conflict) = conflict_for(db.code().as_deref(), db.constraint()) {
                return conflict;
            }
        }
        ApiError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::ResetTokenInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_internal() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn unique_violation_on_email_is_a_conflict() {
        let err = conflict_for(Some("23505"), Some("users_email_key")).expect("conflict");
        assert!(matches!(&err, ApiError::Conflict(msg) if msg.contains("email")));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unique_violation_on_cnic_is_a_conflict() {
        let err = conflict_for(Some("23505"), Some("users_cnic_key")).expect("conflict");
        assert!(matches!(&err, ApiError::Conflict(msg) if msg.contains("cnic")));
    }

    #[test]
    fn unique_violation_with_unknown_constraint_still_conflicts() {
        let err = conflict_for(Some("23505"), None).expect("conflict");
        assert!(matches!(&err, ApiError::Conflict(msg) if msg.contains("record")));
    }

    #[test]
    fn other_database_codes_are_not_conflicts() {
        // 23503 = foreign_key_violation
        assert!(conflict_for(Some("23503"), Some("loans_user_id_fkey")).is_none());
        assert!(conflict_for(None, Some("users_email_key")).is_none());
    }
}
