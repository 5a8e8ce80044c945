use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use tandem_db::models::DuoRow;
use tandem_types::api::{Claims, JoinDuoRequest};
use tandem_types::models::Duo;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{parse_timestamp, parse_uuid};

fn duo_response(row: &DuoRow) -> Duo {
    Duo {
        user1: parse_uuid(&row.user1, "duo user1"),
        user2: parse_uuid(&row.user2, "duo user2"),
        created_at: parse_timestamp(&row.created_at, "duo"),
    }
}

/// GET /duos — the caller's confirmed pairing.
pub async fn get_duo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let duo = state
        .db
        .find_duo_for(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::NotFound("No confirmed duo found".into()))?;

    Ok(Json(duo_response(&duo)))
}

/// POST /duos/join — pair the caller with the owner of an invitation token.
pub async fn join_duo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinDuoRequest>,
) -> ApiResult<impl IntoResponse> {
    let partner = state
        .db
        .get_user_by_invitation_token(&req.invitation_token.to_string())?
        .ok_or_else(|| ApiError::NotFound("Invitation token not found".into()))?;

    let user_id = claims.sub.to_string();
    if partner.id == user_id {
        return Err(ApiError::BadRequest("Cannot form a duo with yourself".into()));
    }

    let paired = state
        .db
        .create_duo(&Uuid::new_v4().to_string(), &user_id, &partner.id)?;
    if !paired {
        return Err(ApiError::Conflict("One of the users is already in a duo".into()));
    }

    let duo = state
        .db
        .find_duo_for(&user_id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Duo missing after insert")))?;

    Ok((StatusCode::CREATED, Json(duo_response(&duo))))
}
