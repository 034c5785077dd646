use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::loans::repo_types::{Loan, LoanStatus};

const LOAN_COLUMNS: &str =
    "id, user_id, amount, purpose, duration_months, status, created_at, updated_at";

impl Loan {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        amount: Decimal,
        purpose: &str,
        duration_months: i32,
    ) -> Result<Loan, sqlx::Error> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (user_id, amount, purpose, duration_months)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(amount)
        .bind(purpose)
        .bind(duration_months)
        .fetch_one(db)
        .await
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Loan>, sqlx::Error> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {LOAN_COLUMNS} FROM loans
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Fetch a loan only if it belongs to the given user.
    pub async fn find_for_user(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Loan>, sqlx::Error> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1 AND user_id = $2"#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_all(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<Loan>, sqlx::Error> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {LOAN_COLUMNS} FROM loans
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: LoanStatus,
    ) -> Result<Option<Loan>, sqlx::Error> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await
    }
}
