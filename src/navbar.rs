//! Top navigation bar: who is signed in, their avatar, and the profile menu.

use crate::backend::ProfileBackend;
use crate::models::admin::CachedIdentity;
use crate::profile::avatar::append_cache_param;

pub const PROFILE_HREF: &str = "/profile";
pub const SIGN_OUT_ACTION: &str = "/logout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavbarView {
    pub display_name: String,
    /// `None` renders the generic user icon.
    pub avatar_src: Option<String>,
}

impl NavbarView {
    /// `now_ms` is appended to the avatar URL so a just-replaced image is not
    /// served from the browser cache.
    pub fn build(identity: Option<&CachedIdentity>, now_ms: i64) -> Self {
        let display_name = identity
            .and_then(|i| i.full_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Admin")
            .to_string();

        let avatar_src = identity
            .and_then(|i| i.avatar_url.as_deref())
            .filter(|url| !url.is_empty())
            .map(|url| append_cache_param(url, now_ms));

        Self { display_name, avatar_src }
    }

    pub fn profile_href(&self) -> &'static str {
        PROFILE_HREF
    }

    pub fn sign_out_action(&self) -> &'static str {
        SIGN_OUT_ACTION
    }
}

/// Tell the backend the admin is signing out. Failures are logged and
/// swallowed; the caller ends the local session regardless.
pub async fn sign_out(backend: &dyn ProfileBackend, admin_id: Option<i64>) -> bool {
    let Some(admin_id) = admin_id else {
        return false;
    };
    match backend.sign_out(admin_id).await {
        Ok(()) => {
            log::info!("Admin {admin_id} signed out");
            true
        }
        Err(e) => {
            log::warn!("Logout error for admin {admin_id}: {e}");
            false
        }
    }
}
