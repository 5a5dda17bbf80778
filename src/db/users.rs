use crate::db::models::User;
use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

/// Insert the user, or mark an existing one as synced again.
///
/// Safe to call any number of times for the same identity: concurrent requests
/// from one browser may each trigger a sync.
pub async fn upsert_synced_user(pool: &SqlitePool, external_id: &str) -> AppResult<User> {
    let candidate = User::new(external_id.to_string());

    sqlx::query(
        "INSERT INTO users (id, external_id, created_at, updated_at, last_synced_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(external_id) DO UPDATE SET
             updated_at = excluded.updated_at,
             last_synced_at = excluded.last_synced_at",
    )
    .bind(&candidate.id)
    .bind(&candidate.external_id)
    .bind(&candidate.created_at)
    .bind(&candidate.updated_at)
    .bind(&candidate.last_synced_at)
    .execute(pool)
    .await?;

    // The row may predate this call, so read back what is actually stored
    find_by_external_id(pool, external_id).await
}

pub async fn find_by_external_id(pool: &SqlitePool, external_id: &str) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = ?")
        .bind(external_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                AppError::NotFound(format!("User '{}' has not been synced", external_id))
            }
            _ => AppError::Database(e),
        })?;

    Ok(user)
}
