pub mod auth;
pub mod duos;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod rules;
pub mod scores;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;

/// Build the full application router. The server binary layers CORS and
/// request tracing on top; tests drive this router directly.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/rules",
            get(rules::list_rules)
                .post(rules::create_rule)
                .put(rules::update_rule)
                .delete(rules::delete_rule),
        )
        .route("/rules/approve", post(rules::approve_modification_request))
        .route(
            "/rules/modification-request",
            delete(rules::withdraw_modification_request),
        )
        .route("/scores", get(scores::get_scores).post(scores::update_scores))
        .route("/duos", get(duos::get_duo))
        .route("/duos/join", post(duos::join_duo))
        .route("/users/push-token", put(auth::set_push_token))
        .layer(axum::middleware::from_fn(middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

pub(crate) fn join_err(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
}

pub(crate) fn parse_timestamp(value: &str, context: &str) -> chrono::DateTime<chrono::Utc> {
    value
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", value, context, e);
            chrono::DateTime::default()
        })
}

pub(crate) fn parse_uuid(value: &str, context: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' on {}: {}", value, context, e);
        Uuid::default()
    })
}

#[cfg(test)]
mod tests;
