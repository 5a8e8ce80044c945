use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A confirmed two-user pairing. A user belongs to at most one duo at a time;
/// the pairing layer enforces this before inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duo {
    pub user1: Uuid,
    pub user2: Uuid,
    pub created_at: DateTime<Utc>,
}

/// How an over-limit app is blocked on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterventionType {
    /// Hard block once a limit is exhausted.
    Full,
    /// Overlay nag that can be dismissed.
    Partial,
}

impl InterventionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FULL" => Some(Self::Full),
            "PARTIAL" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// The mutable field set shared by a rule and a pending modification request.
/// Approval copies the whole struct onto the rule, so structural equality is
/// the approval post-condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSettings {
    pub is_active: bool,
    pub intervention_type: InterventionType,
    /// Time of day at which the daily allowance resets.
    pub daily_reset: NaiveTime,
    pub daily_max_seconds: u32,
    pub hourly_max_seconds: u32,
    pub session_max_seconds: u32,
    pub is_daily_max_seconds_enforced: bool,
    pub is_hourly_max_seconds_enforced: bool,
    pub is_session_max_seconds_enforced: bool,
    pub is_startup_delay_enabled: bool,
}
