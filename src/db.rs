use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::models::admin::{self, NewAdmin, Role};

pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the first admin when the admins table is empty. Returns the new id,
/// or `None` when admins already exist.
pub async fn seed_admin(pool: &PgPool, email: &str, password_hash: &str) -> Result<Option<i64>, sqlx::Error> {
    if admin::count(pool).await? > 0 {
        return Ok(None);
    }
    let new = NewAdmin {
        full_name: "Administrator".to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role: Role::Superadmin,
    };
    let id = admin::create(pool, &new).await?;
    log::info!("Seeded initial admin {email} (id {id})");
    Ok(Some(id))
}
