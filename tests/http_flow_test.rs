//! End-to-end HTTP tests over the real routes and templates, with the
//! in-memory backend standing in for Postgres.
//!
//! Run with: cargo test --test http_flow_test -- --nocapture

mod common;

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use tempfile::TempDir;

use adminpanel::auth::rate_limit::RateLimiter;
use adminpanel::backend::{AVATAR_BUCKET, LocalObjectStore};
use adminpanel::config::AppConfig;
use adminpanel::handlers;
use adminpanel::models::admin::Role;
use common::*;

const SESSION_COOKIE: &str = "id";

/// Cookie jar of one, enough for the single session cookie.
#[derive(Default)]
struct Browser {
    cookie: Option<Cookie<'static>>,
}

impl Browser {
    fn remember<B>(&mut self, resp: &ServiceResponse<B>) {
        if let Some(c) = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE) {
            self.cookie = Some(c.into_owned());
        }
    }

    fn get(&self, uri: &str) -> test::TestRequest {
        self.attach(test::TestRequest::get().uri(uri))
    }

    fn post(&self, uri: &str, form: &[(&str, &str)]) -> test::TestRequest {
        self.attach(test::TestRequest::post().uri(uri).set_form(form))
    }

    fn attach(&self, req: test::TestRequest) -> test::TestRequest {
        match &self.cookie {
            Some(c) => req.cookie(c.clone()),
            None => req,
        }
    }
}

fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn csrf_token(body: &str) -> String {
    let marker = "name=\"csrf_token\" value=\"";
    let start = body.find(marker).expect("page has a CSRF field") + marker.len();
    let end = body[start..].find('"').expect("closing quote") + start;
    body[start..end].to_string()
}

/// Send `req`, keep its session cookie, return status, redirect target and body.
macro_rules! send {
    ($app:expr, $browser:expr, $req:expr) => {{
        let req = $req.to_request();
        let resp = test::call_service($app, req).await;
        $browser.remember(&resp);
        let status = resp.status();
        let loc = location(&resp);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf-8 body");
        (status, loc, body)
    }};
}

macro_rules! app {
    ($backend:expr, $dir:expr) => {{
        let service = service_with($backend.clone());
        let store = LocalObjectStore::new($dir.path(), "http://localhost:8080");
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new(service))
                .app_data(web::Data::new(AppConfig::default()))
                .app_data(web::Data::new(RateLimiter::default()))
                .app_data(web::Data::new(store))
                .configure(handlers::configure),
        )
        .await
    }};
}

/// Sign in through the login form; evaluates to the browser holding the session.
macro_rules! sign_in {
    ($app:expr) => {{
        let mut browser = Browser::default();
        let (_, _, body) = send!($app, browser, browser.get("/login"));
        let token = csrf_token(&body);
        let form = [("email", ADMIN_EMAIL), ("password", ADMIN_PASS), ("csrf_token", token.as_str())];
        let (status, loc, _) = send!($app, browser, browser.post("/login", &form));
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(loc.as_deref(), Some("/profile"));
        browser
    }};
}

#[actix_rt::test]
async fn test_profile_requires_sign_in() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = Browser::default();

    let (status, loc, _) = send!(&app, browser, browser.get("/profile"));

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(loc.as_deref(), Some("/login"));
}

#[actix_rt::test]
async fn test_sign_in_and_view_profile() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (status, _, body) = send!(&app, browser, browser.get("/profile"));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ada Lovelace"));
    assert!(body.contains("badge-red"));
    assert!(body.contains("Super Admin"));
    assert!(body.contains("ui-avatars.com"), "initials avatar when none uploaded");
    assert!(body.contains("No recent activity"));
}

#[actix_rt::test]
async fn test_wrong_password_shows_error() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = Browser::default();

    let (_, _, body) = send!(&app, browser, browser.get("/login"));
    let token = csrf_token(&body);
    let form = [("email", ADMIN_EMAIL), ("password", "nope"), ("csrf_token", token.as_str())];
    let (status, _, body) = send!(&app, browser, browser.post("/login", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Invalid email or password"));
}

#[actix_rt::test]
async fn test_pending_admin_cannot_sign_in() {
    let dir = TempDir::new().expect("temp dir");
    let mut identity = sample_identity();
    identity.role = Role::Pending;
    let backend = MemoryBackend::shared(identity);
    let app = app!(backend, dir);
    let mut browser = Browser::default();

    let (_, _, body) = send!(&app, browser, browser.get("/login"));
    let token = csrf_token(&body);
    let form = [("email", ADMIN_EMAIL), ("password", ADMIN_PASS), ("csrf_token", token.as_str())];
    let (status, _, body) = send!(&app, browser, browser.post("/login", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your account is pending approval"));
}

#[actix_rt::test]
async fn test_edit_profile_round_trip() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile?edit=1"));
    assert!(body.contains("Save Changes"));
    let token = csrf_token(&body);

    let form = [("full_name", "Ada King"), ("email", "ada.king@example.com"), ("csrf_token", token.as_str())];
    let (status, loc, _) = send!(&app, browser, browser.post("/profile", &form));
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(loc.as_deref(), Some("/profile"));

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    assert!(body.contains("Profile updated successfully"));
    assert!(body.contains("ada.king@example.com"));
    assert_eq!(backend.identity().map(|i| i.email).as_deref(), Some("ada.king@example.com"));
}

#[actix_rt::test]
async fn test_blank_email_keeps_edit_form_open() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    let form = [("full_name", "Draft Name"), ("email", ""), ("csrf_token", token.as_str())];
    let (status, _, body) = send!(&app, browser, browser.post("/profile", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Email is required"));
    assert!(body.contains("value=\"Draft Name\""), "draft is retained");
}

#[actix_rt::test]
async fn test_blank_name_shows_placeholder() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    let form = [("full_name", "  "), ("email", ADMIN_EMAIL), ("csrf_token", token.as_str())];
    let (status, _, _) = send!(&app, browser, browser.post("/profile", &form));
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    assert!(body.contains("No name set"));
    assert!(body.contains("<span class=\"navbar-name\">Admin</span>"));
}

#[actix_rt::test]
async fn test_password_mismatch_is_shown_in_panel() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile?password=1"));
    let token = csrf_token(&body);
    let form = [
        ("current_password", ADMIN_PASS),
        ("new_password", "abcdef"),
        ("confirm_password", "abcdeg"),
        ("csrf_token", token.as_str()),
    ];
    let (status, _, body) = send!(&app, browser, browser.post("/profile/password", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Passwords do not match"));
    assert!(body.contains("Update Password"), "password panel stays open");
    assert!(body.contains("value=\"abcdeg\""), "submitted fields are echoed back");
    assert_eq!(backend.password(), ADMIN_PASS);
}

#[actix_rt::test]
async fn test_avatar_upload_updates_navbar() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    let form = [
        ("file_name", "me.png"),
        ("avatar_data_uri", "data:image/png;base64,iVBORw0KGgo="),
        ("csrf_token", token.as_str()),
    ];
    let (status, _, _) = send!(&app, browser, browser.post("/profile/avatar", &form));
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    assert!(body.contains("Avatar updated successfully"));
    assert!(body.contains("cdn.example.com"));
    assert_eq!(backend.objects().len(), 1);
}

#[actix_rt::test]
async fn test_rejected_avatar_shows_upload_error() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    let form = [
        ("file_name", "notes.txt"),
        ("avatar_data_uri", "data:text/plain;base64,aGVsbG8="),
        ("csrf_token", token.as_str()),
    ];
    let (status, _, body) = send!(&app, browser, browser.post("/profile/avatar", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Upload Error:"));
    assert!(body.contains("Please select a valid image file"));
    assert!(backend.objects().is_empty());
}

#[actix_rt::test]
async fn test_svg_avatar_is_refused() {
    let dir = TempDir::new().expect("temp dir");
    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    // <svg><script>alert(1)</script></svg>
    let form = [
        ("file_name", "me.svg"),
        ("avatar_data_uri", "data:image/svg+xml;base64,PHN2Zz48c2NyaXB0PmFsZXJ0KDEpPC9zY3JpcHQ+PC9zdmc+"),
        ("csrf_token", token.as_str()),
    ];
    let (status, _, body) = send!(&app, browser, browser.post("/profile/avatar", &form));

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Please select a valid image file"));
    assert!(backend.objects().is_empty());
}

#[actix_rt::test]
async fn test_stored_objects_cannot_run_script() {
    let dir = TempDir::new().expect("temp dir");
    let store = LocalObjectStore::new(dir.path(), "http://localhost:8080");
    store.ensure_bucket(AVATAR_BUCKET).await.expect("bucket");
    let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>";
    store
        .upload(AVATAR_BUCKET, "admin-avatars/1_1.svg", svg, "image/svg+xml", true)
        .await
        .expect("stored");

    let backend = MemoryBackend::shared(sample_identity());
    let app = app!(backend, dir);
    let req = test::TestRequest::get()
        .uri(&format!("/storage/{AVATAR_BUCKET}/admin-avatars/1_1.svg"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let csp = resp
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(csp.contains("sandbox"), "got CSP {csp:?}");
    assert!(csp.contains("default-src 'none'"));
    assert_eq!(
        resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}

#[actix_rt::test]
async fn test_sign_out_ends_session_even_when_backend_fails() {
    let dir = TempDir::new().expect("temp dir");
    let backend = Arc::new(MemoryBackend::new(sample_identity()).with_faults(|f| {
        f.sign_out = Some(adminpanel::backend::BackendError::Other("offline".into()))
    }));
    let app = app!(backend, dir);
    let mut browser = sign_in!(&app);

    let (_, _, body) = send!(&app, browser, browser.get("/profile"));
    let token = csrf_token(&body);
    let (status, loc, _) = send!(&app, browser, browser.post("/logout", &[("csrf_token", token.as_str())]));
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(loc.as_deref(), Some("/login"));

    let (status, loc, _) = send!(&app, browser, browser.get("/profile"));
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(loc.as_deref(), Some("/login"));
}
