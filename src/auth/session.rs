use actix_session::Session;

use crate::errors::AppError;
use crate::models::admin::{CachedIdentity, Identity};

pub const ADMIN_ID_KEY: &str = "admin_id";
const IDENTITY_KEY: &str = "identity";
const FLASH_KEY: &str = "flash";

pub fn get_admin_id(session: &Session) -> Option<i64> {
    session.get::<i64>(ADMIN_ID_KEY).unwrap_or(None)
}

/// Admin id of the signed-in session, or a session error (redirects to /login).
pub fn require_admin_id(session: &Session) -> Result<i64, AppError> {
    get_admin_id(session).ok_or_else(|| AppError::Session("Not signed in".to_string()))
}

/// Start a signed-in session for `identity`.
pub fn sign_in(session: &Session, identity: &Identity) -> Result<(), AppError> {
    session.renew();
    session
        .insert(ADMIN_ID_KEY, identity.id)
        .map_err(|e| AppError::Session(format!("Failed to store admin id: {e}")))?;
    store_identity(session, identity);
    Ok(())
}

pub fn cached_identity(session: &Session) -> Option<CachedIdentity> {
    session.get::<CachedIdentity>(IDENTITY_KEY).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable cached identity: {e}");
        None
    })
}

/// Replace the cached identity with a freshly fetched one.
pub fn store_identity(session: &Session, identity: &Identity) {
    if let Err(e) = session.insert(IDENTITY_KEY, CachedIdentity::from(identity)) {
        log::warn!("Could not cache identity {} in session: {e}", identity.id);
    }
}

/// Overwrite only the cached avatar URL (optimistic update before a re-fetch).
pub fn store_avatar_url(session: &Session, avatar_url: Option<&str>) {
    if let Some(mut cached) = cached_identity(session) {
        cached.avatar_url = avatar_url.map(str::to_string);
        if let Err(e) = session.insert(IDENTITY_KEY, cached) {
            log::warn!("Could not cache avatar URL in session: {e}");
        }
    }
}

pub fn set_flash(session: &Session, message: &str) {
    let _ = session.insert(FLASH_KEY, message);
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>(FLASH_KEY).unwrap_or(None);
    if flash.is_some() {
        session.remove(FLASH_KEY);
    }
    flash
}
