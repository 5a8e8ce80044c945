use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveTime;
use tracing::{debug, warn};
use uuid::Uuid;

use tandem_db::models::{ModificationRequestRow, RuleRow};
use tandem_types::api::{AppRequest, Claims, ModificationData, RuleResponse, RuleUpsertRequest};
use tandem_types::models::{InterventionType, RuleSettings};

use crate::auth::AppStateInner;
use crate::error::{ApiError, ApiResult};
use crate::{join_err, parse_timestamp, policy};

/// GET /rules — every rule visible to the duo, each annotated with its pending
/// modification request (if any).
pub async fn list_rules(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let requester = uid.clone();

    // Run blocking DB reads off the async runtime
    let db = state.clone();
    let (rules, requests) = tokio::task::spawn_blocking(move || {
        let duo = db.db.find_duo_for(&uid)?.ok_or(ApiError::NotInDuo)?;
        let partner = duo.partner_of(&uid).to_string();
        let rules = db.db.list_rules_for_pair(&uid, &partner)?;
        let requests = db.db.list_modification_requests_for_pair(&uid, &partner)?;
        Ok::<_, ApiError>((rules, requests))
    })
    .await
    .map_err(join_err)??;

    // Composite-key join of rules to their pending requests, built once per call.
    let mut pending: HashMap<(String, String), ModificationData> = HashMap::new();
    for request in &requests {
        pending.insert(
            (request.app.clone(), request.user_id.clone()),
            modification_data(request),
        );
    }

    let list: Vec<RuleResponse> = rules
        .iter()
        .map(|rule| {
            let modification = pending.remove(&(rule.app.clone(), rule.user_id.clone()));
            rule_response(rule, &requester, modification)
        })
        .collect();

    Ok(Json(list))
}

/// POST /rules — create a rule for an app the caller has none for yet.
pub async fn create_rule(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RuleUpsertRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Err(errors) = policy::validate(&req.settings) {
        return Err(ApiError::Validation(errors));
    }

    let uid = claims.sub.to_string();
    let rule_id = Uuid::new_v4();

    let created = state
        .db
        .create_rule(&rule_id.to_string(), &uid, &req.app, &req.settings)?;
    if !created {
        return Err(ApiError::Conflict("A rule for this app already exists".into()));
    }

    let rule = state
        .db
        .get_rule(&uid, &req.app)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Rule missing after insert")))?;

    Ok((StatusCode::CREATED, Json(rule_response(&rule, &uid, None))))
}

/// PUT /rules — mutate a rule the caller owns. A tightening payload applies
/// in place (200); a loosening payload becomes a pending modification request
/// and notifies the partner (201).
pub async fn update_rule(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RuleUpsertRequest>,
) -> ApiResult<Response> {
    let uid = claims.sub.to_string();
    let app = req.app.clone();

    // Ownership and duo membership are checked before payload validation.
    let db = state.clone();
    let lookup_uid = uid.clone();
    let lookup_app = app.clone();
    let (rule, duo) = tokio::task::spawn_blocking(move || {
        let rule = db
            .db
            .get_rule(&lookup_uid, &lookup_app)?
            .ok_or_else(|| ApiError::NotFound("Rule not found or not owned by user".into()))?;
        let duo = db.db.find_duo_for(&lookup_uid)?.ok_or(ApiError::NotInDuo)?;
        Ok::<_, ApiError>((rule, duo))
    })
    .await
    .map_err(join_err)??;

    if let Err(errors) = policy::validate(&req.settings) {
        return Err(ApiError::Validation(errors));
    }

    let current = rule_settings(&rule);
    if policy::direct_update_allowed(&current, &req.settings) {
        let db = state.clone();
        let u = uid.clone();
        let a = app.clone();
        let settings = req.settings.clone();
        let updated = tokio::task::spawn_blocking(move || {
            if !db.db.update_rule_settings(&u, &a, &settings)? {
                return Err(ApiError::NotFound("Rule not found or not owned by user".into()));
            }
            db.db
                .get_rule(&u, &a)?
                .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Rule missing after update")))
        })
        .await
        .map_err(join_err)??;

        return Ok((StatusCode::OK, Json(rule_response(&updated, &uid, None))).into_response());
    }

    // Loosening change: record a proposal and ask the partner to approve it.
    let db = state.clone();
    let u = uid.clone();
    let a = app.clone();
    let settings = req.settings.clone();
    let request_row = tokio::task::spawn_blocking(move || {
        db.db
            .upsert_modification_request(&Uuid::new_v4().to_string(), &u, &a, &settings)?;
        db.db
            .get_modification_request(&u, &a)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Modification request missing after upsert")))
    })
    .await
    .map_err(join_err)??;

    let proposer = claims.username.clone();
    let partner_id = duo.partner_of(&uid).to_string();
    notify(
        &state,
        &partner_id,
        "Rule modification request",
        format!("{} has requested a rule modification", proposer),
    );

    let modification = Some(modification_data(&request_row));
    Ok((StatusCode::CREATED, Json(rule_response(&rule, &uid, modification))).into_response())
}

/// POST /rules/approve — the partner accepts the proposer's pending request:
/// every mutable field is copied onto the rule, the request is consumed, and
/// the proposer is notified.
pub async fn approve_modification_request(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AppRequest>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();

    let db = state.clone();
    let u = uid.clone();
    let app = req.app.clone();
    let (rule, proposer_id) = tokio::task::spawn_blocking(move || {
        let duo = db.db.find_duo_for(&u)?.ok_or(ApiError::NotInDuo)?;
        let proposer = duo.partner_of(&u).to_string();
        if db.db.get_modification_request(&proposer, &app)?.is_none() {
            return Err(ApiError::NotFound(
                "Rule modification request not found or not owned by user".into(),
            ));
        }
        let rule = db
            .db
            .apply_modification_request(&proposer, &app)?
            .ok_or_else(|| ApiError::NotFound("Rule not found".into()))?;
        Ok::<_, ApiError>((rule, proposer))
    })
    .await
    .map_err(join_err)??;

    notify(
        &state,
        &proposer_id,
        "Rule modification request approved",
        format!("{} has approved your rule modification request", claims.username),
    );

    Ok(Json(rule_response(&rule, &uid, None)))
}

/// DELETE /rules/modification-request — the proposer withdraws their own
/// pending request. No notification.
pub async fn withdraw_modification_request(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AppRequest>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();

    let db = state.clone();
    let u = uid.clone();
    let app = req.app.clone();
    let rule = tokio::task::spawn_blocking(move || {
        db.db.find_duo_for(&u)?.ok_or(ApiError::NotInDuo)?;
        if db.db.get_modification_request(&u, &app)?.is_none() {
            return Err(ApiError::NotFound(
                "Rule modification request not found or not owned by user".into(),
            ));
        }
        let rule = db
            .db
            .get_rule(&u, &app)?
            .ok_or_else(|| ApiError::NotFound("Rule not found".into()))?;
        db.db.delete_modification_request(&u, &app)?;
        Ok::<_, ApiError>(rule)
    })
    .await
    .map_err(join_err)??;

    Ok(Json(rule_response(&rule, &uid, None)))
}

/// DELETE /rules — delete a rule the caller owns. A pending modification
/// request for the same key is removed with it.
pub async fn delete_rule(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AppRequest>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.db.delete_rule(&claims.sub.to_string(), &req.app)?;
    if !deleted {
        return Err(ApiError::NotFound("Rule not found or not owned by user".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Best-effort push to `recipient_id`. Users without a stored device token
/// are skipped; a failed lookup only logs.
fn notify(state: &AppStateInner, recipient_id: &str, title: &str, body: String) {
    let user = match state.db.get_user_by_id(recipient_id) {
        Ok(user) => user,
        Err(e) => {
            warn!("Recipient lookup for push '{}' failed: {:#}", title, e);
            return;
        }
    };

    match user.and_then(|u| u.push_token) {
        Some(token) => state.push.dispatch(token, title.to_string(), body),
        None => debug!("No push token for user {}, skipping '{}'", recipient_id, title),
    }
}

fn rule_settings(row: &RuleRow) -> RuleSettings {
    RuleSettings {
        is_active: row.is_active,
        intervention_type: parse_intervention(&row.intervention_type, &row.id),
        daily_reset: parse_reset(&row.daily_reset, &row.id),
        daily_max_seconds: row.daily_max_seconds,
        hourly_max_seconds: row.hourly_max_seconds,
        session_max_seconds: row.session_max_seconds,
        is_daily_max_seconds_enforced: row.is_daily_max_seconds_enforced,
        is_hourly_max_seconds_enforced: row.is_hourly_max_seconds_enforced,
        is_session_max_seconds_enforced: row.is_session_max_seconds_enforced,
        is_startup_delay_enabled: row.is_startup_delay_enabled,
    }
}

fn request_settings(row: &ModificationRequestRow) -> RuleSettings {
    RuleSettings {
        is_active: row.is_active,
        intervention_type: parse_intervention(&row.intervention_type, &row.id),
        daily_reset: parse_reset(&row.daily_reset, &row.id),
        daily_max_seconds: row.daily_max_seconds,
        hourly_max_seconds: row.hourly_max_seconds,
        session_max_seconds: row.session_max_seconds,
        is_daily_max_seconds_enforced: row.is_daily_max_seconds_enforced,
        is_hourly_max_seconds_enforced: row.is_hourly_max_seconds_enforced,
        is_session_max_seconds_enforced: row.is_session_max_seconds_enforced,
        is_startup_delay_enabled: row.is_startup_delay_enabled,
    }
}

fn parse_intervention(value: &str, row_id: &str) -> InterventionType {
    InterventionType::parse(value).unwrap_or_else(|| {
        warn!("Corrupt intervention_type '{}' on row '{}'", value, row_id);
        InterventionType::Full
    })
}

fn parse_reset(value: &str, row_id: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M:%S").unwrap_or_else(|e| {
        warn!("Corrupt daily_reset '{}' on row '{}': {}", value, row_id, e);
        NaiveTime::MIN
    })
}

fn modification_data(row: &ModificationRequestRow) -> ModificationData {
    ModificationData {
        app: row.app.clone(),
        settings: request_settings(row),
        created_at: parse_timestamp(&row.created_at, "modification request"),
    }
}

fn rule_response(row: &RuleRow, requester_id: &str, modification: Option<ModificationData>) -> RuleResponse {
    RuleResponse {
        app: row.app.clone(),
        is_my_rule: row.user_id == requester_id,
        settings: rule_settings(row),
        created_at: parse_timestamp(&row.created_at, "rule"),
        last_modified_at: parse_timestamp(&row.last_modified_at, "rule"),
        modification_data: modification,
    }
}
