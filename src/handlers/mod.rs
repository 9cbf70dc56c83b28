pub mod auth_handlers;
pub mod profile_handlers;
pub mod storage_handlers;

use actix_web::{HttpResponse, middleware::from_fn, web};

use crate::auth::middleware::require_auth;

/// Register every route. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Static files
        .service(actix_files::Files::new("/static", "./static"))
        // Public routes
        .route("/login", web::get().to(auth_handlers::login_page))
        .route("/login", web::post().to(auth_handlers::login_submit))
        .route("/storage/{bucket}/{path:.*}", web::get().to(storage_handlers::serve))
        // Root redirect
        .route("/", web::get().to(|| async {
            HttpResponse::SeeOther()
                .insert_header(("Location", "/profile"))
                .finish()
        }))
        // Protected routes
        .service(
            web::scope("")
                .wrap(from_fn(require_auth))
                .route("/logout", web::post().to(auth_handlers::logout))
                .route("/profile", web::get().to(profile_handlers::show))
                .route("/profile", web::post().to(profile_handlers::update))
                .route("/profile/password", web::post().to(profile_handlers::change_password))
                .route("/profile/avatar", web::post().to(profile_handlers::upload_avatar)),
        );
}
