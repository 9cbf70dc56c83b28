use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of entries shown in the profile activity feed.
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Width of the "recent actions" window, in days.
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub action: String,
    pub table_name: String,
    pub record_id: i64,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn icon(&self) -> &'static str {
        match self.action.as_str() {
            "created" => "\u{2795}",
            "updated" => "\u{270F}\u{FE0F}",
            "deleted" => "\u{1F5D1}\u{FE0F}",
            "approved" => "\u{2705}",
            "rejected" => "\u{274C}",
            "profile_updated" => "\u{1F464}",
            "password_changed" => "\u{1F512}",
            "avatar_updated" => "\u{1F4F8}",
            _ => "\u{1F4DD}",
        }
    }

    /// Human-readable action, e.g. `profile_updated` -> `Profile updated`.
    pub fn label(&self) -> String {
        let text = self.action.replace('_', " ");
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Counters shown next to the activity feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total_actions: i64,
    pub recent_actions: i64,
    pub last_login: Option<DateTime<Utc>>,
}

/// Activity feed plus stats, each section independently degraded on failure.
#[derive(Debug, Clone, Default)]
pub struct ActivityPanel {
    pub entries: Vec<ActivityLogEntry>,
    pub stats: ActivityStats,
}
