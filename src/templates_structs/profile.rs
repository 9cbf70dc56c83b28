use askama::Template;

use crate::models::activity::{ActivityLogEntry, ActivityStats};
use crate::models::admin::{Identity, RoleBadge};
use crate::profile::{PasswordChangeForm, ProfileEditForm, ProfileError};
use super::PageContext;

/// One message in the page's error panel.
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl From<&ProfileError> for FieldError {
    fn from(err: &ProfileError) -> Self {
        FieldError {
            field: err.field(),
            message: err.message().to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub ctx: PageContext,
    pub identity: Identity,
    pub badge: RoleBadge,
    /// Avatar shown in the profile card (uploaded image or generated initials).
    pub avatar_src: String,
    pub editing: bool,
    pub edit_form: ProfileEditForm,
    pub changing_password: bool,
    pub require_current_password: bool,
    /// Password fields echoed back after a failed attempt.
    pub password: Option<&'a PasswordChangeForm>,
    pub errors: Vec<FieldError>,
    pub entries: Vec<ActivityLogEntry>,
    pub stats: ActivityStats,
}

impl ProfileTemplate<'_> {
    /// First error reported against `field`, if any.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Errors that belong to no specific input (shown in the page banner).
    pub fn general_errors(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == crate::profile::FIELD_GENERAL)
            .map(|e| e.message.as_str())
            .collect()
    }
}
