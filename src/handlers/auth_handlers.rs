use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{csrf, rate_limit::RateLimiter, session};
use crate::config::AppConfig;
use crate::errors::{AppError, render};
use crate::navbar;
use crate::profile::ProfileService;
use crate::templates_structs::LoginTemplate;

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    #[serde(default)]
    pub csrf_token: String,
}

fn login_form(session: &Session, config: &AppConfig, email: &str, error: Option<&str>) -> Result<HttpResponse, AppError> {
    let tmpl = LoginTemplate {
        error: error.map(str::to_string),
        app_name: config.app_name.clone(),
        csrf_token: csrf::get_or_create_token(session),
        email: email.to_string(),
    };
    render(tmpl)
}

pub async fn login_page(
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    if session::get_admin_id(&session).is_some() {
        return Ok(HttpResponse::SeeOther()
            .insert_header(("Location", "/profile"))
            .finish());
    }
    login_form(&session, &config, "", None)
}

pub async fn login_submit(
    req: HttpRequest,
    service: web::Data<ProfileService>,
    config: web::Data<AppConfig>,
    session: Session,
    form: web::Form<LoginForm>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    // Rate-limit check before touching the backend
    let ip = req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    if limiter.is_blocked(ip) {
        return login_form(
            &session,
            &config,
            &form.email,
            Some("Too many failed sign-in attempts. Please try again later."),
        );
    }

    match service.backend().authenticate(&form.email, &form.password).await? {
        Some(identity) if identity.role.is_pending() => {
            log::info!("Sign-in refused for pending admin {}", identity.id);
            login_form(&session, &config, &form.email, Some("Your account is pending approval"))
        }
        Some(identity) => {
            limiter.clear(ip);
            session::sign_in(&session, &identity)?;
            log::info!("Admin {} signed in", identity.id);
            Ok(HttpResponse::SeeOther()
                .insert_header(("Location", "/profile"))
                .finish())
        }
        None => {
            limiter.record_failure(ip);
            login_form(&session, &config, &form.email, Some("Invalid email or password"))
        }
    }
}

/// Sign out never fails from the user's point of view: backend and CSRF
/// problems are logged, the session is purged either way.
pub async fn logout(
    service: web::Data<ProfileService>,
    session: Session,
    form: web::Form<CsrfOnly>,
) -> HttpResponse {
    if let Err(e) = csrf::validate_csrf(&session, &form.csrf_token) {
        log::warn!("Sign-out request failed CSRF validation: {e}");
    }
    navbar::sign_out(service.backend().as_ref(), session::get_admin_id(&session)).await;
    session.purge();
    HttpResponse::SeeOther()
        .insert_header(("Location", "/login"))
        .finish()
}
