use std::fmt;

use serde::Deserialize;
use serde_json::json;

use super::{FIELD_CURRENT_PASSWORD, FIELD_GENERAL, ProfileError, ProfileService};
use crate::audit::{AuditAction, AuditRecord};
use crate::auth::validate;

/// Password change fields. Redacted in `Debug`, wiped on drop.
#[derive(Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeForm {
    pub fn new(current_password: &str, new_password: &str, confirm_password: &str) -> Self {
        Self {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    /// Overwrite and empty every field.
    pub fn clear(&mut self) {
        wipe(&mut self.current_password);
        wipe(&mut self.new_password);
        wipe(&mut self.confirm_password);
    }

    pub fn is_empty(&self) -> bool {
        self.current_password.is_empty() && self.new_password.is_empty() && self.confirm_password.is_empty()
    }
}

fn wipe(value: &mut String) {
    let mut bytes = std::mem::take(value).into_bytes();
    bytes.fill(0);
    std::hint::black_box(&bytes);
}

impl Drop for PasswordChangeForm {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for PasswordChangeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChangeForm")
            .field("current_password", &"[redacted]")
            .field("new_password", &"[redacted]")
            .field("confirm_password", &"[redacted]")
            .finish()
    }
}

impl ProfileService {
    /// Change the signed-in admin's password.
    ///
    /// Local validation (match, then length) runs before any backend call. On
    /// success the form is cleared; on failure it is left as submitted.
    pub async fn change_password(
        &self,
        admin_id: i64,
        form: &mut PasswordChangeForm,
    ) -> Result<(), ProfileError> {
        if let Some((field, message)) =
            validate::validate_new_password(&form.new_password, &form.confirm_password)
        {
            return Err(ProfileError::invalid(field, message));
        }

        if self.require_current_password {
            if form.current_password.is_empty() {
                return Err(ProfileError::invalid(
                    FIELD_CURRENT_PASSWORD,
                    "Current password is required",
                ));
            }
            let matches = self
                .backend
                .verify_password(admin_id, &form.current_password)
                .await
                .map_err(|e| ProfileError::backend(FIELD_GENERAL, e.message()))?;
            if !matches {
                return Err(ProfileError::invalid(
                    FIELD_CURRENT_PASSWORD,
                    "Current password is incorrect",
                ));
            }
        }

        self.backend
            .update_password(admin_id, &form.new_password)
            .await
            .map_err(|e| ProfileError::backend(FIELD_GENERAL, e.message()))?;

        self.audit.record(AuditRecord::own_profile(
            admin_id,
            AuditAction::PasswordChanged,
            json!({ "password_updated": true }),
        ));

        form.clear();
        log::info!("Admin {admin_id} changed their password");
        Ok(())
    }
}
