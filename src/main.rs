use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use adminpanel::audit::AuditQueue;
use adminpanel::auth::{self, rate_limit::RateLimiter};
use adminpanel::backend::{AVATAR_BUCKET, LocalObjectStore, PgBackend, ProfileBackend};
use adminpanel::config::AppConfig;
use adminpanel::db;
use adminpanel::handlers;
use adminpanel::profile::{MAX_AVATAR_BYTES, ProfileService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    // Seed the first admin if the table is empty
    let admin_hash = auth::password::hash_password(&config.seed_admin_password)
        .map_err(std::io::Error::other)?;
    db::seed_admin(&pool, &config.seed_admin_email, &admin_hash)
        .await
        .map_err(std::io::Error::other)?;

    let store = LocalObjectStore::new(&config.storage_dir, &config.public_base_url);
    store.ensure_bucket(AVATAR_BUCKET).await?;

    let backend: Arc<dyn ProfileBackend> = Arc::new(PgBackend::new(pool, store.clone()));
    let audit = AuditQueue::spawn(backend.clone());
    let service = ProfileService::new(backend, audit)
        .with_current_password_check(config.require_current_password);

    // Session encryption key: load from SESSION_KEY for sessions that survive restarts
    let secret_key = match config.session_key.as_deref() {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let bind_addr = config.bind_addr.clone();
    let cookie_secure = config.cookie_secure;
    let service = web::Data::new(service);
    let config = web::Data::new(config);
    let limiter = web::Data::new(RateLimiter::default());
    let store = web::Data::new(store);

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .build();

        // Avatars arrive base64-encoded inside the form body
        let form_config = web::FormConfig::default().limit(MAX_AVATAR_BYTES * 2);

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .app_data(config.clone())
            .app_data(limiter.clone())
            .app_data(store.clone())
            .app_data(form_config)
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                let html = include_str!("../templates/errors/404.html");
                actix_web::HttpResponse::NotFound()
                    .content_type("text/html; charset=utf-8")
                    .body(html)
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
