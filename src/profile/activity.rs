use chrono::{Duration, Utc};

use super::ProfileService;
use crate::models::activity::{
    ActivityLogEntry, ActivityPanel, ActivityStats, RECENT_ACTIVITY_LIMIT, RECENT_WINDOW_DAYS,
};
use crate::models::admin::Identity;

impl ProfileService {
    /// Activity feed and stats for the profile page.
    ///
    /// The feed and the counters are fetched concurrently. Either one failing
    /// is logged and falls back to an empty feed or zero counts.
    pub async fn load_activity(&self, identity: &Identity) -> ActivityPanel {
        let (entries, stats) = tokio::join!(self.recent_activity(identity.id), self.activity_stats(identity));
        ActivityPanel { entries, stats }
    }

    pub async fn recent_activity(&self, admin_id: i64) -> Vec<ActivityLogEntry> {
        match self.backend.list_activity(admin_id, RECENT_ACTIVITY_LIMIT).await {
            Ok(mut entries) => {
                entries.truncate(RECENT_ACTIVITY_LIMIT as usize);
                entries
            }
            Err(e) => {
                log::error!("Failed to fetch activity logs for admin {admin_id}: {e}");
                Vec::new()
            }
        }
    }

    pub async fn activity_stats(&self, identity: &Identity) -> ActivityStats {
        let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
        let (total, recent) = tokio::join!(
            self.backend.count_activity(identity.id, None),
            self.backend.count_activity(identity.id, Some(since)),
        );

        let last_login = Some(identity.updated_at);
        match (total, recent) {
            (Ok(total_actions), Ok(recent_actions)) => ActivityStats {
                total_actions,
                recent_actions,
                last_login,
            },
            (Err(e), _) | (_, Err(e)) => {
                log::error!("Failed to fetch activity stats for admin {}: {e}", identity.id);
                ActivityStats { last_login, ..ActivityStats::default() }
            }
        }
    }
}
