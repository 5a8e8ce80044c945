use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RuleSettings;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and token issuance.
/// Canonical definition lives here in tandem-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub invitation_token: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub invitation_token: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushTokenRequest {
    pub token: String,
}

// -- Duos --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinDuoRequest {
    pub invitation_token: Uuid,
}

// -- Rules --

/// Body of both rule creation and rule update. The settings block is flattened
/// so the wire shape matches the client's camelCase rule object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpsertRequest {
    pub app: String,
    #[serde(flatten)]
    pub settings: RuleSettings,
}

/// Body of approve / withdraw / delete, which address a rule by app alone.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppRequest {
    pub app: String,
}

/// A pending proposed next state for a rule, awaiting partner approval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationData {
    pub app: String,
    #[serde(flatten)]
    pub settings: RuleSettings,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub app: String,
    /// Whether the rule belongs to the requesting user (as opposed to the
    /// duo partner). Computed per request, never stored.
    pub is_my_rule: bool,
    #[serde(flatten)]
    pub settings: RuleSettings,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub modification_data: Option<ModificationData>,
}

// -- Scores --

#[derive(Debug, Deserialize)]
pub struct ScoreEntry {
    /// `YYYY-MM-DD`; parsed by the handler so a bad date yields a field-level
    /// message rather than a bare deserialization failure.
    pub date: String,
    pub value: i64,
    pub uninterrupted_tracking: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateScoresRequest {
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub date: NaiveDate,
    pub value: i64,
    pub uninterrupted_tracking: bool,
}
