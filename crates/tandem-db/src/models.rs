/// Database row types — these map directly to SQLite rows.
/// Distinct from tandem-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub invitation_token: String,
    pub push_token: Option<String>,
    pub created_at: String,
}

pub struct DuoRow {
    pub id: String,
    pub user1: String,
    pub user2: String,
    pub created_at: String,
}

impl DuoRow {
    /// The other party of the pairing. Callers have already established that
    /// `user_id` is a member.
    pub fn partner_of(&self, user_id: &str) -> &str {
        if self.user1 == user_id {
            &self.user2
        } else {
            &self.user1
        }
    }
}

pub struct RuleRow {
    pub id: String,
    pub user_id: String,
    pub app: String,
    pub is_active: bool,
    pub intervention_type: String,
    pub daily_reset: String,
    pub daily_max_seconds: u32,
    pub hourly_max_seconds: u32,
    pub session_max_seconds: u32,
    pub is_daily_max_seconds_enforced: bool,
    pub is_hourly_max_seconds_enforced: bool,
    pub is_session_max_seconds_enforced: bool,
    pub is_startup_delay_enabled: bool,
    pub created_at: String,
    pub last_modified_at: String,
}

pub struct ModificationRequestRow {
    pub id: String,
    pub user_id: String,
    pub app: String,
    pub is_active: bool,
    pub intervention_type: String,
    pub daily_reset: String,
    pub daily_max_seconds: u32,
    pub hourly_max_seconds: u32,
    pub session_max_seconds: u32,
    pub is_daily_max_seconds_enforced: bool,
    pub is_hourly_max_seconds_enforced: bool,
    pub is_session_max_seconds_enforced: bool,
    pub is_startup_delay_enabled: bool,
    pub created_at: String,
}

pub struct ScoreRow {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub value: i64,
    pub uninterrupted_tracking: bool,
    pub created_at: String,
    pub last_modified_at: String,
}
