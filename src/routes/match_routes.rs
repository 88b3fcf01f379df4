use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::match_dto::{
        AdvanceStatusPayload, AdvanceStatusResponse, CreateMatchPayload, MatchListQuery,
        MatchListResponse, NextStatusesResponse, RollbackQuery, StatusDictionaryEntry,
    },
    error::Result,
    models::match_record::MatchFilter,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/matches",
    request_body = CreateMatchPayload,
    responses(
        (status = 201, description = "Match created"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_match(
    State(state): State<AppState>,
    Json(payload): Json<CreateMatchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state.match_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/matches",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("candidateId" = Option<String>, Query, description = "Filter by candidate"),
        ("jobId" = Option<String>, Query, description = "Filter by job"),
        ("companyId" = Option<String>, Query, description = "Filter by company"),
        ("limit" = Option<usize>, Query, description = "Maximum number of matches")
    ),
    responses(
        (status = 200, description = "Matches, newest first")
    )
)]
#[axum::debug_handler]
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchListQuery>,
) -> Result<impl IntoResponse> {
    let filter = MatchFilter::from(query);
    let items = state.match_service.list(&filter).await?;
    let total = items.len();
    Ok(Json(MatchListResponse { items, total }))
}

#[utoipa::path(
    get,
    path = "/api/matches/stats",
    responses(
        (status = 200, description = "Match counts per status, average score, matches created this month")
    )
)]
#[axum::debug_handler]
pub async fn get_match_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.match_service.stats().await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/matches/statuses",
    responses(
        (status = 200, description = "Status dictionary with labels and allowed transitions")
    )
)]
#[axum::debug_handler]
pub async fn list_match_statuses() -> impl IntoResponse {
    Json(StatusDictionaryEntry::all())
}

#[utoipa::path(
    get,
    path = "/api/matches/{id}",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    responses(
        (status = 200, description = "Match with its timeline"),
        (status = 404, description = "Match not found")
    )
)]
#[axum::debug_handler]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state.match_service.get(&id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/matches/{id}/next-statuses",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    responses(
        (status = 200, description = "Statuses reachable from the current status"),
        (status = 404, description = "Match not found")
    )
)]
#[axum::debug_handler]
pub async fn get_next_statuses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let (current, next) = state.match_service.next_statuses(&id).await?;
    Ok(Json(NextStatusesResponse { current, next }))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/status",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    request_body = AdvanceStatusPayload,
    responses(
        (status = 200, description = "Status updated, or duplicate submission ignored"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Match changed since it was read"),
        (status = 422, description = "Transition not allowed from the current status")
    )
)]
#[axum::debug_handler]
pub async fn update_match_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AdvanceStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .match_service
        .advance(payload.into_request(id))
        .await?;
    Ok(Json(AdvanceStatusResponse::from(outcome)))
}

#[utoipa::path(
    delete,
    path = "/api/matches/{id}/timeline/{entry_id}",
    params(
        ("id" = String, Path, description = "Match ID"),
        ("entry_id" = String, Path, description = "Timeline entry ID"),
        ("expectedLatestEntryId" = Option<String>, Query, description = "Latest entry id the caller last saw")
    ),
    responses(
        (status = 200, description = "Latest entry removed, match status recomputed"),
        (status = 404, description = "Match or entry not found"),
        (status = 409, description = "Entry is not the latest one")
    )
)]
#[axum::debug_handler]
pub async fn delete_timeline_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
    Query(query): Query<RollbackQuery>,
) -> Result<impl IntoResponse> {
    let record = state
        .match_service
        .rollback(&id, &entry_id, query.expected_latest_entry_id.as_deref())
        .await?;
    Ok(Json(record))
}
