//! Decides whether a rule change applies immediately or needs the partner's
//! approval: tightening is self-serve, loosening goes through a proposal.

use tandem_types::models::{InterventionType, RuleSettings};

use crate::error::FieldError;

const MAX_DAILY_SECONDS: u32 = 86_400;
const MAX_HOURLY_SECONDS: u32 = 3_600;
const MAX_SESSION_SECONDS: u32 = 86_400;

/// Structural validation shared by the direct and the proposal path.
pub fn validate(settings: &RuleSettings) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if settings.is_daily_max_seconds_enforced && settings.daily_max_seconds == 0 {
        errors.push(FieldError {
            field: "dailyMaxSeconds",
            message: "Must be positive when enforced".into(),
        });
    }
    if settings.daily_max_seconds > MAX_DAILY_SECONDS {
        errors.push(FieldError {
            field: "dailyMaxSeconds",
            message: "Cannot exceed 24 hours".into(),
        });
    }

    if settings.is_hourly_max_seconds_enforced && settings.hourly_max_seconds == 0 {
        errors.push(FieldError {
            field: "hourlyMaxSeconds",
            message: "Must be positive when enforced".into(),
        });
    }
    if settings.hourly_max_seconds > MAX_HOURLY_SECONDS {
        errors.push(FieldError {
            field: "hourlyMaxSeconds",
            message: "Cannot exceed one hour".into(),
        });
    }

    if settings.is_session_max_seconds_enforced && settings.session_max_seconds == 0 {
        errors.push(FieldError {
            field: "sessionMaxSeconds",
            message: "Must be positive when enforced".into(),
        });
    }
    if settings.session_max_seconds > MAX_SESSION_SECONDS {
        errors.push(FieldError {
            field: "sessionMaxSeconds",
            message: "Cannot exceed 24 hours".into(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// True when `proposed` may overwrite `current` without partner approval.
/// Every changed field must tighten the rule or leave it untouched; a single
/// loosening field routes the whole payload through the proposal flow.
pub fn direct_update_allowed(current: &RuleSettings, proposed: &RuleSettings) -> bool {
    proposed.daily_max_seconds <= current.daily_max_seconds
        && proposed.hourly_max_seconds <= current.hourly_max_seconds
        && proposed.session_max_seconds <= current.session_max_seconds
        && keeps_enabled(current.is_daily_max_seconds_enforced, proposed.is_daily_max_seconds_enforced)
        && keeps_enabled(current.is_hourly_max_seconds_enforced, proposed.is_hourly_max_seconds_enforced)
        && keeps_enabled(current.is_session_max_seconds_enforced, proposed.is_session_max_seconds_enforced)
        && keeps_enabled(current.is_active, proposed.is_active)
        && keeps_enabled(current.is_startup_delay_enabled, proposed.is_startup_delay_enabled)
        && !(current.intervention_type == InterventionType::Full
            && proposed.intervention_type == InterventionType::Partial)
        // Moving the reset point can grant a fresh allowance mid-day.
        && proposed.daily_reset == current.daily_reset
}

/// A boolean restriction may turn on without approval, never off.
fn keeps_enabled(current: bool, proposed: bool) -> bool {
    proposed || !current
}
