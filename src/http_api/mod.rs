use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    BacklogItem, EngineError, FixedInterval, GenerationReport, MotivationRecord, Outcome,
    Scheduler, Session, SessionStatus, StatusUpdate, parse_local_datetime,
};

/// Header carrying the caller's identity; stands in for real authentication.
pub const OWNER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    scheduler: Arc<Scheduler>,
    default_owner: Arc<str>,
}

impl AppState {
    pub fn new(scheduler: Scheduler, default_owner: impl Into<String>) -> Self {
        Self::with_shared(Arc::new(scheduler), default_owner)
    }

    pub fn with_shared(scheduler: Arc<Scheduler>, default_owner: impl Into<String>) -> Self {
        Self {
            scheduler,
            default_owner: Arc::from(default_owner.into()),
        }
    }

    fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler.clone()
    }

    fn owner(&self, headers: &HeaderMap) -> String {
        headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_owner.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    EmptyBacklog(String),
    PartialEffect { message: String, session: Session },
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        let message = value.to_string();
        match value {
            EngineError::NotFound(_) => ApiError::NotFound(message),
            EngineError::InvalidInput(_) => ApiError::Invalid(message),
            EngineError::Conflict(_) => ApiError::Conflict(message),
            EngineError::EmptyBacklog(_) => ApiError::EmptyBacklog(message),
            EngineError::PartialEffect { session, .. } => ApiError::PartialEffect {
                message,
                session: *session,
            },
            EngineError::Storage(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, session) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message, None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message, None),
            ApiError::Invalid(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message, None)
            }
            ApiError::EmptyBacklog(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "empty_backlog",
                message,
                None,
            ),
            ApiError::PartialEffect { message, session } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_effect",
                message,
                Some(session),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                None,
            ),
        };
        let body = Json(ErrorBody {
            error,
            message,
            session,
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CreateGamePayload {
    title: String,
    #[serde(default)]
    genre: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFixedEventPayload {
    title: String,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusPayload {
    status: String,
}

#[derive(Debug, Deserialize)]
struct PlayResultPayload {
    schedule_id: String,
    result: String,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/pending", get(list_pending_games))
        .route(
            "/calendar/fixed-events",
            get(list_fixed_events).post(create_fixed_event),
        )
        .route("/calendar/generate", post(generate_schedule))
        .route("/calendar/schedule", get(list_schedule))
        .route("/calendar/schedule/:id", put(update_schedule_status))
        .route("/motivation", get(get_motivation))
        .route("/motivation/result", post(report_play_result));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn create_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGamePayload>,
) -> Result<(StatusCode, Json<BacklogItem>), ApiError> {
    let owner = state.owner(&headers);
    let item = state.scheduler().create_backlog_item(
        &owner,
        &payload.title,
        payload.genre.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn list_games(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BacklogItem>>, ApiError> {
    let owner = state.owner(&headers);
    Ok(Json(state.scheduler().list_backlog(&owner)?))
}

async fn list_pending_games(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BacklogItem>>, ApiError> {
    let owner = state.owner(&headers);
    Ok(Json(state.scheduler().list_unstarted(&owner)?))
}

async fn create_fixed_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateFixedEventPayload>,
) -> Result<(StatusCode, Json<FixedInterval>), ApiError> {
    let start = parse_local_datetime(&payload.start_time).map_err(ApiError::invalid)?;
    let end = parse_local_datetime(&payload.end_time).map_err(ApiError::invalid)?;
    let owner = state.owner(&headers);
    let event = state
        .scheduler()
        .create_fixed_event(&owner, &payload.title, start, end)?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_fixed_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FixedInterval>>, ApiError> {
    let owner = state.owner(&headers);
    Ok(Json(state.scheduler().list_fixed_events(&owner)?))
}

async fn generate_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<GenerationReport>), ApiError> {
    let owner = state.owner(&headers);
    let report = state.scheduler().generate_report(&owner)?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn list_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let owner = state.owner(&headers);
    let scheduler = state.scheduler();
    let sessions = match (range.start, range.end) {
        (None, None) => scheduler.list_sessions(&owner)?,
        (Some(start), Some(end)) => {
            let start = parse_local_datetime(&start).map_err(ApiError::invalid)?;
            let end = parse_local_datetime(&end).map_err(ApiError::invalid)?;
            scheduler.list_sessions_in_range(&owner, start, end)?
        }
        _ => return Err(ApiError::invalid("start and end must be given together")),
    };
    Ok(Json(sessions))
}

async fn update_schedule_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<StatusUpdate>, ApiError> {
    let status: SessionStatus = payload.status.parse().map_err(ApiError::invalid)?;
    let owner = state.owner(&headers);
    let update = state
        .scheduler()
        .update_owned_status(&owner, &session_id, status)?;
    Ok(Json(update))
}

async fn get_motivation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MotivationRecord>, ApiError> {
    let owner = state.owner(&headers);
    Ok(Json(state.scheduler().motivation(&owner)?))
}

async fn report_play_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PlayResultPayload>,
) -> Result<Json<StatusUpdate>, ApiError> {
    let outcome: Outcome = payload.result.parse().map_err(ApiError::invalid)?;
    let owner = state.owner(&headers);
    let update = state
        .scheduler()
        .report_play_result(&owner, &payload.schedule_id, outcome)?;
    Ok(Json(update))
}
