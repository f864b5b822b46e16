use sqlx::PgPool;

use crate::models::User;

/// Inserts an account. Registration is handled elsewhere; this exists for
/// seeding and tests.
pub async fn create(
    pool: &PgPool,
    email: &str,
    username: &str,
    hashed_password: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, username, hashed_password)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(email)
    .bind(username)
    .bind(hashed_password)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Overwrites the stored hash for `email`. Returns false when no account
/// matched.
pub async fn update_password_by_email(
    pool: &PgPool,
    email: &str,
    hashed_password: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET hashed_password = $2, updated_at = now() WHERE email = $1",
    )
    .bind(email)
    .bind(hashed_password)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
