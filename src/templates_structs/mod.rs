// Template context structures for Askama templates, organized by page.

use actix_session::Session;
use chrono::Utc;

use crate::auth::csrf;
use crate::auth::session::{cached_identity, take_flash};
use crate::navbar::NavbarView;

mod common;
mod profile;

pub use self::common::LoginTemplate;
pub use self::profile::{FieldError, ProfileTemplate};

/// Common context shared by all signed-in pages.
/// Templates access these as `ctx.navbar`, `ctx.flash`, etc.
pub struct PageContext {
    pub app_name: String,
    pub navbar: NavbarView,
    pub flash: Option<String>,
    pub csrf_token: String,
    pub current_path: String,
}

impl PageContext {
    /// Built from the session's cached identity; no backend round-trip.
    pub fn build(session: &Session, app_name: &str, current_path: &str) -> Self {
        let identity = cached_identity(session);
        let navbar = NavbarView::build(identity.as_ref(), Utc::now().timestamp_millis());
        Self {
            app_name: app_name.to_string(),
            navbar,
            flash: take_flash(session),
            csrf_token: csrf::get_or_create_token(session),
            current_path: current_path.to_string(),
        }
    }
}
