use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    loans::{
        dto::{ApplyLoanRequest, Pagination},
        repo_types::Loan,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/loans", post(apply_loan).get(list_loans))
        .route("/loans/:id", get(get_loan))
}

#[instrument(skip(state, payload))]
pub async fn apply_loan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ApplyLoanRequest>,
) -> ApiResult<(StatusCode, Json<Loan>)> {
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::Validation("Amount must be positive".into()));
    }
    if payload.purpose.trim().is_empty() {
        return Err(ApiError::Validation("Purpose is required".into()));
    }
    if !(1..=360).contains(&payload.duration_months) {
        warn!(duration = payload.duration_months, "duration out of range");
        return Err(ApiError::Validation(
            "Duration must be between 1 and 360 months".into(),
        ));
    }

    let loan = Loan::create(
        &state.db,
        user_id,
        payload.amount,
        payload.purpose.trim(),
        payload.duration_months,
    )
    .await?;

    info!(loan_id = %loan.id, user_id = %user_id, "loan application created");
    Ok((StatusCode::CREATED, Json(loan)))
}

#[instrument(skip(state))]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Loan>>> {
    let loans = Loan::list_by_user(&state.db, user_id, p.limit(), p.offset()).await?;
    Ok(Json(loans))
}

#[instrument(skip(state))]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Loan>> {
    let loan = Loan::find_for_user(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan not found".into()))?;
    Ok(Json(loan))
}
