use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use tandem_db::models::ScoreRow;
use tandem_types::api::{Claims, ScoreResponse, UpdateScoresRequest};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /scores?start_date=&end_date= — the caller's scores in an inclusive
/// date range.
pub async fn get_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (Some(start_raw), Some(end_raw)) = (query.start_date, query.end_date) else {
        return Err(ApiError::BadRequest(
            "start_date and end_date parameters are required".into(),
        ));
    };

    let start = parse_date(&start_raw).ok_or_else(|| ApiError::BadRequest("Invalid date format".into()))?;
    let end = parse_date(&end_raw).ok_or_else(|| ApiError::BadRequest("Invalid date format".into()))?;

    let rows = state.db.get_scores_in_range(
        &claims.sub.to_string(),
        &start.format(DATE_FORMAT).to_string(),
        &end.format(DATE_FORMAT).to_string(),
    )?;

    Ok(Json(rows.iter().map(score_response).collect::<Vec<_>>()))
}

/// POST /scores — upsert one entry per date for the caller. The batch either
/// fully commits or fails before the first write.
pub async fn update_scores(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateScoresRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.scores.is_empty() {
        return Err(ApiError::BadRequest("Scores data is required".into()));
    }

    let uid = claims.sub.to_string();
    state.db.find_duo_for(&uid)?.ok_or(ApiError::NotInDuo)?;

    let mut parsed = Vec::with_capacity(req.scores.len());
    for entry in &req.scores {
        let date = parse_date(&entry.date).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid date format for date: {}", entry.date))
        })?;
        parsed.push((date, entry.value, entry.uninterrupted_tracking));
    }

    let mut stored = Vec::with_capacity(parsed.len());
    for (date, value, uninterrupted_tracking) in parsed {
        let row = state.db.upsert_score(
            &Uuid::new_v4().to_string(),
            &uid,
            &date.format(DATE_FORMAT).to_string(),
            value,
            uninterrupted_tracking,
        )?;
        stored.push(score_response(&row));
    }

    Ok(Json(stored))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn score_response(row: &ScoreRow) -> ScoreResponse {
    ScoreResponse {
        date: NaiveDate::parse_from_str(&row.date, DATE_FORMAT).unwrap_or_else(|e| {
            warn!("Corrupt date '{}' on score '{}': {}", row.date, row.id, e);
            NaiveDate::default()
        }),
        value: row.value,
        uninterrupted_tracking: row.uninterrupted_tracking,
    }
}
