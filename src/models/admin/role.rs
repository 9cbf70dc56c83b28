use std::fmt;

/// Admin role. Values outside the known set are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Superadmin,
    Admin,
    Moderator,
    Pending,
    Other(String),
}

/// Display label and style class for a role badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBadge {
    pub label: String,
    pub class: &'static str,
}

pub const NEUTRAL_BADGE_CLASS: &str = "badge-gray";

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Pending => "pending",
            Role::Other(raw) => raw,
        }
    }

    pub fn badge(&self) -> RoleBadge {
        let (label, class) = match self {
            Role::Superadmin => ("Super Admin", "badge-red"),
            Role::Admin => ("Admin", "badge-purple"),
            Role::Moderator => ("Moderator", "badge-blue"),
            Role::Pending => ("Pending Approval", "badge-yellow"),
            Role::Other(raw) => (raw.as_str(), NEUTRAL_BADGE_CLASS),
        };
        RoleBadge { label: label.to_string(), class }
    }

    /// Pending admins have registered but not been approved yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Role::Pending)
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw {
            "superadmin" => Role::Superadmin,
            "admin" => Role::Admin,
            "moderator" => Role::Moderator,
            "pending" => Role::Pending,
            other => Role::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge for a raw role string, as stored in the session cache.
pub fn role_badge(raw: &str) -> RoleBadge {
    Role::from(raw).badge()
}
