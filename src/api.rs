//! JSON-over-HTTP surface for the browser timeline.
//!
//! Every handler forwards to the matching `*_impl` command; failures are
//! written to the command log and returned as `{ "error": message }`.

use crate::application::commands::{
    cancel_proposal_impl, confirm_proposal_impl, create_task_impl, delete_task_impl, drag_task_impl,
    get_analytics_impl, get_layout_impl, list_tags_impl, move_task_impl, open_schedule_impl,
    resize_task_impl, shift_task_impl, update_status_impl, AnalyticsView, AppState, LayoutView,
    OperationResponse, ScheduleView,
};
use crate::domain::error::ScheduleError;
use crate::domain::models::NewTask;
use crate::infrastructure::error::InfraError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

type SharedState = Arc<AppState>;
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn command(state: &AppState, command: &str, error: InfraError) -> Self {
        let status = status_for(&error);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(command, error = %error, "command failed");
        }
        Self {
            status,
            message: state.command_error(command, &error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

fn status_for(error: &InfraError) -> StatusCode {
    match error {
        InfraError::InvalidInput(_)
        | InfraError::Schedule(ScheduleError::InvalidFormat(_) | ScheduleError::InvalidTask(_)) => {
            StatusCode::BAD_REQUEST
        }
        InfraError::Schedule(ScheduleError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
        InfraError::Schedule(ScheduleError::ProposalPending | ScheduleError::NoPendingProposal) => {
            StatusCode::CONFLICT
        }
        InfraError::Io(_)
        | InfraError::Json(_)
        | InfraError::InvalidConfig(_)
        | InfraError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleQuery {
    user_id: String,
    date: String,
    /// Comma-separated tag filter.
    #[serde(default)]
    tags: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionParams {
    user_id: String,
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskBody {
    user_id: String,
    date: String,
    task: NewTask,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveTaskBody {
    user_id: String,
    date: String,
    start_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftTaskBody {
    user_id: String,
    date: String,
    /// Wins over `delta_px` when both are sent.
    #[serde(default)]
    delta_minutes: Option<i32>,
    #[serde(default)]
    delta_px: Option<f64>,
    #[serde(default)]
    slot_height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResizeTaskBody {
    user_id: String,
    date: String,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    user_id: String,
    date: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutQuery {
    user_id: String,
    date: String,
    #[serde(default)]
    slot_height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsQuery {
    user_id: String,
    date: String,
    #[serde(default)]
    days: Option<u32>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(open_schedule).post(create_task))
        .route("/api/tasks/{id}", axum::routing::delete(delete_task))
        .route("/api/tasks/{id}/move", post(move_task))
        .route("/api/tasks/{id}/shift", post(shift_task))
        .route("/api/tasks/{id}/resize", post(resize_task))
        .route("/api/tasks/{id}/status", post(update_status))
        .route("/api/proposal/confirm", post(confirm_proposal))
        .route("/api/proposal/cancel", post(cancel_proposal))
        .route("/api/layout", get(layout))
        .route("/api/analytics", get(analytics))
        .route("/api/tags", get(tags))
        .with_state(state)
}

/// Binds `addr` and serves the API on a background task.
pub async fn start_server(
    addr: &str,
    state: SharedState,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(error = %error, "http server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn open_schedule(
    State(state): State<SharedState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<ScheduleView> {
    let tags = query
        .tags
        .as_deref()
        .map(|raw| raw.split(',').map(ToOwned::to_owned).collect())
        .unwrap_or_default();
    open_schedule_impl(&state, query.user_id, query.date, tags)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "open_schedule", error))
}

async fn create_task(
    State(state): State<SharedState>,
    Json(body): Json<CreateTaskBody>,
) -> ApiResult<OperationResponse> {
    create_task_impl(&state, body.user_id, body.date, body.task)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "create_task", error))
}

async fn move_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
    Json(body): Json<MoveTaskBody>,
) -> ApiResult<OperationResponse> {
    move_task_impl(&state, body.user_id, body.date, task_id, body.start_time)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "move_task", error))
}

async fn shift_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
    Json(body): Json<ShiftTaskBody>,
) -> ApiResult<OperationResponse> {
    let result = match (body.delta_minutes, body.delta_px) {
        (Some(delta_minutes), _) => {
            shift_task_impl(&state, body.user_id, body.date, task_id, delta_minutes).await
        }
        (None, Some(delta_px)) => {
            drag_task_impl(
                &state,
                body.user_id,
                body.date,
                task_id,
                delta_px,
                body.slot_height,
            )
            .await
        }
        (None, None) => Err(InfraError::InvalidInput(
            "shift needs deltaMinutes or deltaPx".to_string(),
        )),
    };
    result
        .map(Json)
        .map_err(|error| ApiError::command(&state, "shift_task", error))
}

async fn resize_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
    Json(body): Json<ResizeTaskBody>,
) -> ApiResult<OperationResponse> {
    resize_task_impl(
        &state,
        body.user_id,
        body.date,
        task_id,
        body.start_time,
        body.end_time,
    )
    .await
    .map(Json)
    .map_err(|error| ApiError::command(&state, "resize_task", error))
}

async fn update_status(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<OperationResponse> {
    update_status_impl(&state, body.user_id, body.date, task_id, body.status)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "update_status", error))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
    Query(query): Query<SessionParams>,
) -> ApiResult<OperationResponse> {
    delete_task_impl(&state, query.user_id, query.date, task_id)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "delete_task", error))
}

async fn confirm_proposal(
    State(state): State<SharedState>,
    Json(body): Json<SessionParams>,
) -> ApiResult<OperationResponse> {
    confirm_proposal_impl(&state, body.user_id, body.date)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "confirm_proposal", error))
}

async fn cancel_proposal(
    State(state): State<SharedState>,
    Json(body): Json<SessionParams>,
) -> ApiResult<OperationResponse> {
    cancel_proposal_impl(&state, body.user_id, body.date)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "cancel_proposal", error))
}

async fn layout(
    State(state): State<SharedState>,
    Query(query): Query<LayoutQuery>,
) -> ApiResult<LayoutView> {
    get_layout_impl(&state, query.user_id, query.date, query.slot_height)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "get_layout", error))
}

async fn analytics(
    State(state): State<SharedState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<AnalyticsView> {
    get_analytics_impl(&state, query.user_id, query.date, query.days)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "get_analytics", error))
}

async fn tags(
    State(state): State<SharedState>,
    Query(query): Query<SessionParams>,
) -> ApiResult<Vec<String>> {
    list_tags_impl(&state, query.user_id, query.date)
        .await
        .map(Json)
        .map_err(|error| ApiError::command(&state, "list_tags", error))
}
