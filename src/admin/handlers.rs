use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    admin::dto::UpdateLoanStatusRequest,
    auth::jwt::AdminUser,
    error::{ApiError, ApiResult},
    loans::{
        dto::Pagination,
        repo_types::{Loan, LoanStatus},
    },
    notifications::repo_types::Notification,
    state::AppState,
    users::{dto::PublicUser, repo_types::User},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/loans", get(list_all_loans))
        .route("/admin/loans/:id/status", patch(update_loan_status))
}

fn status_message(loan: &Loan) -> String {
    let verdict = match loan.status {
        LoanStatus::Pending => "is pending review",
        LoanStatus::Approved => "has been approved",
        LoanStatus::Rejected => "has been rejected",
        LoanStatus::Repaid => "has been marked repaid",
    };
    format!("Your loan application for {} {}.", loan.amount, verdict)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = User::list_all(&state.db, p.limit(), p.offset()).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if id == admin_id {
        return Err(ApiError::Validation("Cannot delete own account".into()));
    }
    let deleted = User::delete(&state.db, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %id, admin_id = %admin_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_all_loans(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Loan>>> {
    let loans = Loan::list_all(&state.db, p.limit(), p.offset()).await?;
    Ok(Json(loans))
}

#[instrument(skip(state, payload))]
pub async fn update_loan_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLoanStatusRequest>,
) -> ApiResult<Json<Loan>> {
    let loan = Loan::set_status(&state.db, id, payload.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan not found".into()))?;

    // The borrower hears about the decision; a failed notification must not
    // roll back the status change.
    if let Err(e) = Notification::create(&state.db, loan.user_id, &status_message(&loan)).await {
        error!(error = %e, loan_id = %loan.id, "notification write failed");
    }

    info!(loan_id = %loan.id, status = ?loan.status, admin_id = %admin_id, "loan status updated");
    Ok(Json(loan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn loan_with_status(status: LoanStatus) -> Loan {
        Loan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: Decimal::new(250000, 2),
            purpose: "equipment".into(),
            duration_months: 12,
            status,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn status_messages_name_the_decision() {
        let approved = status_message(&loan_with_status(LoanStatus::Approved));
        assert!(approved.contains("approved"));
        assert!(approved.contains("2500.00"));

        let rejected = status_message(&loan_with_status(LoanStatus::Rejected));
        assert!(rejected.contains("rejected"));
    }
}
