use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// The signed-in admin's profile record, as owned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// The full name, treating a blank one as unset.
    pub fn name(&self) -> Option<&str> {
        self.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Name to greet the admin with.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or("Admin")
    }

    /// Generated initials avatar used when no avatar has been uploaded.
    pub fn fallback_avatar_url(&self, size: u32) -> String {
        let name = self
            .name()
            .unwrap_or(if self.email.is_empty() { "Admin" } else { &self.email });
        format!(
            "https://ui-avatars.com/api/?name={}&background=4f46e5&color=fff&size={size}",
            urlencoding::encode(name)
        )
    }
}

/// Row shape of the `admins` table (role kept as raw text).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdentityRow {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            avatar_url: row.avatar_url,
            role: Role::from(row.role.as_str()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial update of an admin profile. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileChanges {
    pub fn details(full_name: &str, email: &str, now: DateTime<Utc>) -> Self {
        Self {
            full_name: Some(full_name.to_string()),
            email: Some(email.to_string()),
            avatar_url: None,
            updated_at: now,
        }
    }

    pub fn avatar(url: &str, now: DateTime<Utc>) -> Self {
        Self {
            full_name: None,
            email: None,
            avatar_url: Some(url.to_string()),
            updated_at: now,
        }
    }
}

/// Read-mostly copy of the identity kept in the session for the navbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: String,
}

impl From<&Identity> for CachedIdentity {
    fn from(identity: &Identity) -> Self {
        CachedIdentity {
            id: identity.id,
            full_name: identity.full_name.clone(),
            email: identity.email.clone(),
            avatar_url: identity.avatar_url.clone(),
            role: identity.role.as_str().to_string(),
        }
    }
}

/// Seed data for a new admin account.
pub struct NewAdmin {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
