use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{FIELD_EMAIL, FIELD_GENERAL, ProfileError, ProfileService};
use crate::audit::{AuditAction, AuditRecord};
use crate::models::admin::{Identity, ProfileChanges};

/// Draft of the editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileEditForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileEditForm {
    pub fn seeded_from(identity: &Identity) -> Self {
        Self {
            full_name: identity.full_name.clone().unwrap_or_default(),
            email: identity.email.clone(),
        }
    }
}

impl ProfileService {
    /// Save the draft, then re-fetch the canonical identity.
    ///
    /// Returns the re-fetched identity, or `None` if the save went through but
    /// the re-fetch did not.
    pub async fn update_profile(
        &self,
        admin_id: i64,
        form: &ProfileEditForm,
    ) -> Result<Option<Identity>, ProfileError> {
        let full_name = form.full_name.trim();
        let email = form.email.trim();
        if email.is_empty() {
            return Err(ProfileError::invalid(FIELD_EMAIL, "Email is required"));
        }

        let changes = ProfileChanges::details(full_name, email, Utc::now());
        self.backend
            .update_profile(admin_id, &changes)
            .await
            .map_err(|e| ProfileError::backend(FIELD_GENERAL, e.message()))?;

        let identity = self.refetch(admin_id).await;

        self.audit.record(AuditRecord::own_profile(
            admin_id,
            AuditAction::ProfileUpdated,
            json!({ "full_name": full_name, "email": email }),
        ));

        log::info!("Admin {admin_id} updated their profile");
        Ok(identity)
    }
}
