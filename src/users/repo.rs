use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, cnic, password_hash, role, phone, address, \
     reset_token, reset_token_expiry, created_at, updated_at";

impl User {
    /// Insert a new user. Uniqueness of email/cnic is enforced by the
    /// database constraints; a violating insert fails with a unique-violation
    /// error for the caller to translate.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, cnic, password_hash, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.cnic)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .bind(&new.address)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_all(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Partial profile update. `password_hash`, when present, was produced by
    /// the hash-on-write guard; plaintext never reaches this statement.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                password_hash = COALESCE($5, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(address)
        .bind(password_hash)
        .fetch_optional(db)
        .await
    }

    /// Store a reset token and its expiry in one statement, replacing any
    /// pending pair. Returns `None` when the email is unknown.
    pub async fn set_reset_token(
        db: &PgPool,
        email: &str,
        token: &str,
        expiry: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET reset_token = $2, reset_token_expiry = $3, updated_at = now()
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(token)
        .bind(expiry)
        .fetch_optional(db)
        .await
    }

    /// Consume a reset token: checks equality and expiry, writes the new hash
    /// and clears token+expiry, all in one statement. `None` means the token
    /// was absent, mismatched, or expired.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL,
                updated_at = now()
            WHERE reset_token = $1 AND reset_token_expiry > now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await
    }

    /// Clear an expired pending pair. Token and expiry always go together.
    pub async fn clear_expired_reset_token(db: &PgPool, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = NULL, reset_token_expiry = NULL, updated_at = now()
            WHERE reset_token = $1 AND reset_token_expiry <= now()
            "#,
        )
        .bind(token)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
