use sqlx::PgPool;

use super::types::{IdentityRow, NewAdmin, ProfileChanges};

const SELECT_IDENTITY: &str = "\
    SELECT id, full_name, email, avatar_url, role, created_at, updated_at \
    FROM admins";

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<IdentityRow>, sqlx::Error> {
    let sql = format!("{SELECT_IDENTITY} WHERE id = $1");
    sqlx::query_as::<_, IdentityRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find an admin by email for sign-in. Returns the row with its password hash.
pub async fn find_credentials_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<(IdentityRow, String)>, sqlx::Error> {
    let sql = format!("{SELECT_IDENTITY} WHERE lower(email) = lower($1)");
    let row = sqlx::query_as::<_, IdentityRow>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let hash = find_password_hash_by_id(pool, row.id).await?.unwrap_or_default();
    Ok(Some((row, hash)))
}

pub async fn find_password_hash_by_id(pool: &PgPool, id: i64) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT password_hash FROM admins WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &PgPool, new: &NewAdmin) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO admins (full_name, email, password_hash, role) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&new.full_name)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(new.role.as_str())
    .fetch_one(pool)
    .await
}

/// Apply a partial profile update. Returns the number of rows touched.
pub async fn update_profile(
    pool: &PgPool,
    id: i64,
    changes: &ProfileChanges,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE admins SET \
             full_name = CASE WHEN $2::text IS NULL THEN full_name WHEN BTRIM($2::text) = '' THEN NULL ELSE $2 END, \
             email = COALESCE($3, email), \
             avatar_url = COALESCE($4, avatar_url), \
             updated_at = $5 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.full_name.as_deref())
    .bind(changes.email.as_deref())
    .bind(changes.avatar_url.as_deref())
    .bind(changes.updated_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn update_password(pool: &PgPool, id: i64, password_hash: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE admins SET password_hash = $2, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn record_sign_out(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE admins SET last_sign_out_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
