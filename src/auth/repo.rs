use crate::auth::repo_types::User;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_verified, is_admin, \
     verify_token, verify_token_expiry, forgot_password_token, forgot_password_token_expiry, \
     created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user matching either field, for duplicate detection at signup.
    pub async fn find_by_email_or_username(
        db: &PgPool,
        email: &str,
        username: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new, unverified user with a hashed password.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store a fresh verification token. Overwrites any outstanding one;
    /// only the latest value is ever valid.
    pub async fn store_verify_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET verify_token = $2, verify_token_expiry = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a fresh password-reset token, overwriting any outstanding one.
    pub async fn store_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET forgot_password_token = $2, forgot_password_token_expiry = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Match an unexpired reset token, swap in the new password hash, and
    /// clear the token in one statement. The single-row UPDATE is the
    /// atomicity boundary: a consumed token can never point at an
    /// already-changed password, and a second caller racing on the same
    /// token finds zero rows.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $2, \
             forgot_password_token = NULL, forgot_password_token_expiry = NULL \
             WHERE forgot_password_token = $1 AND forgot_password_token_expiry > NOW() \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Match an unexpired verification token, mark the account verified, and
    /// clear the token in one statement. Replaying the same token finds
    /// nothing once cleared.
    pub async fn consume_verify_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = TRUE, \
             verify_token = NULL, verify_token_expiry = NULL \
             WHERE verify_token = $1 AND verify_token_expiry > NOW() \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
