use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::csrf;
use crate::auth::session::{self, require_admin_id};
use crate::config::AppConfig;
use crate::errors::{AppError, render};
use crate::models::admin::Identity;
use crate::profile::{AvatarUpload, PasswordChangeForm, ProfileEditForm, ProfileError, ProfileService};
use crate::templates_structs::{FieldError, PageContext, ProfileTemplate};

const AVATAR_PREVIEW_SIZE: u32 = 80;

/// `?edit` opens the edit form, `?password` the password panel.
#[derive(Deserialize)]
pub struct ProfileQuery {
    pub edit: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileSubmit {
    pub csrf_token: String,
    #[serde(flatten)]
    pub form: ProfileEditForm,
}

#[derive(Deserialize)]
pub struct PasswordSubmit {
    pub csrf_token: String,
    #[serde(flatten)]
    pub form: PasswordChangeForm,
}

#[derive(Deserialize)]
pub struct AvatarSubmit {
    pub csrf_token: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub avatar_data_uri: String,
}

/// Which panels are open and what they contain.
#[derive(Default)]
struct PageState<'a> {
    editing: bool,
    edit_form: Option<ProfileEditForm>,
    changing_password: bool,
    /// Submitted fields echoed back after a failed attempt.
    password: Option<&'a PasswordChangeForm>,
    errors: Vec<FieldError>,
}

impl PageState<'_> {
    fn with_error(mut self, err: &ProfileError) -> Self {
        self.errors.push(FieldError::from(err));
        self
    }
}

async fn render_page(
    service: &ProfileService,
    config: &AppConfig,
    session: &Session,
    identity: Identity,
    state: PageState<'_>,
) -> Result<HttpResponse, AppError> {
    let activity = service.load_activity(&identity).await;
    let ctx = PageContext::build(session, &config.app_name, "/profile");
    let avatar_src = identity
        .avatar_url
        .clone()
        .unwrap_or_else(|| identity.fallback_avatar_url(AVATAR_PREVIEW_SIZE));
    let edit_form = state
        .edit_form
        .unwrap_or_else(|| ProfileEditForm::seeded_from(&identity));

    let tmpl = ProfileTemplate {
        ctx,
        badge: identity.role.badge(),
        avatar_src,
        identity,
        editing: state.editing,
        edit_form,
        changing_password: state.changing_password,
        require_current_password: service.requires_current_password(),
        password: state.password,
        errors: state.errors,
        entries: activity.entries,
        stats: activity.stats,
    };
    render(tmpl)
}

/// Fetch the canonical identity and refresh the session's cached copy.
async fn fresh_identity(service: &ProfileService, session: &Session, admin_id: i64) -> Result<Identity, AppError> {
    let identity = service.get_profile(admin_id).await?;
    session::store_identity(session, &identity);
    Ok(identity)
}

fn back_to_profile() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", "/profile"))
        .finish()
}

pub async fn show(
    service: web::Data<ProfileService>,
    config: web::Data<AppConfig>,
    session: Session,
    query: web::Query<ProfileQuery>,
) -> Result<HttpResponse, AppError> {
    let admin_id = require_admin_id(&session)?;
    let identity = fresh_identity(&service, &session, admin_id).await?;
    let state = PageState {
        editing: query.edit.is_some(),
        changing_password: query.password.is_some(),
        ..PageState::default()
    };
    render_page(&service, &config, &session, identity, state).await
}

pub async fn update(
    service: web::Data<ProfileService>,
    config: web::Data<AppConfig>,
    session: Session,
    submit: web::Form<ProfileSubmit>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &submit.csrf_token)?;
    let admin_id = require_admin_id(&session)?;
    let submit = submit.into_inner();

    match service.update_profile(admin_id, &submit.form).await {
        Ok(identity) => {
            if let Some(identity) = &identity {
                session::store_identity(&session, identity);
            }
            session::set_flash(&session, "Profile updated successfully");
            Ok(back_to_profile())
        }
        Err(err) => {
            let identity = fresh_identity(&service, &session, admin_id).await?;
            let state = PageState {
                editing: true,
                edit_form: Some(submit.form),
                ..PageState::default()
            }
            .with_error(&err);
            render_page(&service, &config, &session, identity, state).await
        }
    }
}

pub async fn change_password(
    service: web::Data<ProfileService>,
    config: web::Data<AppConfig>,
    session: Session,
    submit: web::Form<PasswordSubmit>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &submit.csrf_token)?;
    let admin_id = require_admin_id(&session)?;
    let mut submit = submit.into_inner();

    match service.change_password(admin_id, &mut submit.form).await {
        Ok(()) => {
            session::set_flash(&session, "Password changed successfully");
            Ok(back_to_profile())
        }
        Err(err) => {
            let identity = fresh_identity(&service, &session, admin_id).await?;
            let state = PageState {
                changing_password: true,
                password: Some(&submit.form),
                ..PageState::default()
            }
            .with_error(&err);
            render_page(&service, &config, &session, identity, state).await
        }
    }
}

pub async fn upload_avatar(
    service: web::Data<ProfileService>,
    config: web::Data<AppConfig>,
    session: Session,
    submit: web::Form<AvatarSubmit>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &submit.csrf_token)?;
    let admin_id = require_admin_id(&session)?;

    let current_avatar = session::cached_identity(&session).and_then(|cached| cached.avatar_url);
    let result = match AvatarUpload::from_data_uri(&submit.file_name, &submit.avatar_data_uri) {
        Ok(upload) => service.upload_avatar(admin_id, current_avatar.as_deref(), upload).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(outcome) => {
            session::store_avatar_url(&session, outcome.state.displayed_url());
            if let Some(identity) = &outcome.identity {
                session::store_identity(&session, identity);
            }
            session::set_flash(&session, "Avatar updated successfully");
            Ok(back_to_profile())
        }
        Err(err) => {
            let identity = fresh_identity(&service, &session, admin_id).await?;
            let state = PageState::default().with_error(&err);
            render_page(&service, &config, &session, identity, state).await
        }
    }
}
