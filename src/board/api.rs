use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::*;
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────
//
// Every field is optional at the serde level; handlers check required ones.

#[derive(Deserialize)]
pub struct CreateBoardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBoardRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsQuery {
    pub board_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnRequest {
    pub title: Option<String>,
    pub color: Option<String>,
    pub board_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateColumnRequest {
    pub title: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub board_id: Option<String>,
    pub column_id: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub column_id: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
}

#[derive(serde::Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        if err.is_internal() {
            tracing::error!(error = %err, "request failed");
            ApiError::Internal("Internal server error".to_string())
        } else if err.is_not_found() {
            tracing::warn!(error = ?err, "record not found");
            ApiError::NotFound(err.to_string())
        } else {
            tracing::warn!(error = %err, "rejected request");
            ApiError::BadRequest(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection, "malformed request body");
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{id}",
            get(get_board).put(update_board).delete(delete_board),
        )
        .route("/api/columns", get(list_columns).post(create_column))
        .route(
            "/api/columns/{id}",
            get(get_column).put(update_column).delete(delete_column),
        )
        .route("/api/tasks", post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Blank strings count as absent for optional text fields.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_boards(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let boards = state.db.call(|db| db.list_boards()).await?;
    tracing::debug!(count = boards.len(), "listed boards");
    Ok(Json(boards))
}

async fn create_board(
    State(state): State<SharedState>,
    payload: Result<Json<CreateBoardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let new = NewBoard {
        title: require_title(req.title.as_deref(), "Title is required")?,
        description: non_blank(req.description),
        color: color_or_default(req.color.as_deref(), DEFAULT_BOARD_COLOR)?,
    };
    let board = state.db.call(move |db| db.create_board(&new)).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let board = state.db.call(move |db| db.get_board(&lookup)).await?;
    match board {
        Some(board) => Ok(Json(board)),
        None => Err(BoardError::BoardNotFound { id }.into()),
    }
}

async fn update_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBoardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let update = BoardUpdate {
        title: require_title(req.title.as_deref(), "Title is required")?,
        description: req.description.map(non_blank),
        color: match req.color.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(c) => Some(check_color(c)?),
        },
    };
    let lookup = id.clone();
    let board = state
        .db
        .call(move |db| db.update_board(&lookup, &update))
        .await?;
    match board {
        Some(board) => Ok(Json(board)),
        None => Err(BoardError::BoardNotFound { id }.into()),
    }
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let deleted = state.db.call(move |db| db.delete_board(&lookup)).await?;
    if !deleted {
        return Err(BoardError::BoardNotFound { id }.into());
    }
    Ok(Json(MessageResponse {
        message: "Board deleted successfully",
    }))
}

async fn list_columns(
    State(state): State<SharedState>,
    Query(query): Query<ColumnsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let board_id = non_blank(query.board_id)
        .map(|id| id.trim().to_string())
        .ok_or_else(|| BoardError::validation("Board ID is required"))?;
    let columns = state.db.call(move |db| db.list_columns(&board_id)).await?;
    Ok(Json(columns))
}

async fn get_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let column = state.db.call(move |db| db.get_column(&lookup)).await?;
    match column {
        Some(column) => Ok(Json(column)),
        None => Err(BoardError::ColumnNotFound { id }.into()),
    }
}

async fn create_column(
    State(state): State<SharedState>,
    payload: Result<Json<CreateColumnRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (Some(title), Some(board_id)) = (non_blank(req.title), non_blank(req.board_id)) else {
        return Err(BoardError::validation("Title and board ID are required").into());
    };
    let new = NewColumn {
        board_id: board_id.trim().to_string(),
        title: title.trim().to_string(),
        color: color_or_default(req.color.as_deref(), DEFAULT_COLUMN_COLOR)?,
    };
    let column = state.db.call(move |db| db.create_column(&new)).await?;
    Ok((StatusCode::CREATED, Json(column)))
}

async fn update_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateColumnRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let update = ColumnUpdate {
        title: match req.title.as_deref() {
            Some(t) => Some(require_title(Some(t), "Title cannot be empty")?),
            None => None,
        },
        color: req.color.as_deref().map(check_color).transpose()?,
        order: req.order.map(check_order).transpose()?,
    };
    let lookup = id.clone();
    let column = if update.is_empty() {
        tracing::debug!(column_id = %id, "column update with no recognised fields");
        state.db.call(move |db| db.get_column(&lookup)).await?
    } else {
        state
            .db
            .call(move |db| db.update_column(&lookup, &update))
            .await?
    };
    match column {
        Some(column) => Ok(Json(column)),
        None => Err(BoardError::ColumnNotFound { id }.into()),
    }
}

async fn delete_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let deleted = state.db.call(move |db| db.delete_column(&lookup)).await?;
    if !deleted {
        return Err(BoardError::ColumnNotFound { id }.into());
    }
    Ok(Json(MessageResponse {
        message: "Column deleted successfully",
    }))
}

async fn create_task(
    State(state): State<SharedState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (Some(title), Some(board_id), Some(column_id)) = (
        non_blank(req.title),
        non_blank(req.board_id),
        non_blank(req.column_id),
    ) else {
        return Err(
            BoardError::validation("Title, board ID, and column ID are required").into(),
        );
    };
    let new = NewTask {
        board_id: board_id.trim().to_string(),
        column_id: column_id.trim().to_string(),
        title: title.trim().to_string(),
        description: non_blank(req.description),
        priority: priority_or_default(req.priority.as_deref())?,
        due_date: req.due_date.as_deref().and_then(parse_due_date),
    };
    let task = state.db.call(move |db| db.create_task(&new)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let task = state.db.call(move |db| db.get_task(&lookup)).await?;
    match task {
        Some(task) => Ok(Json(task)),
        None => Err(BoardError::TaskNotFound { id }.into()),
    }
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let update = TaskUpdate {
        title: match req.title.as_deref() {
            Some(t) => Some(require_title(Some(t), "Title cannot be empty")?),
            None => None,
        },
        description: req.description.map(non_blank),
        column_id: req.column_id.map(|c| c.trim().to_string()),
        priority: match req.priority.as_deref() {
            Some(p) => Some(priority_or_default(Some(p))?),
            None => None,
        },
        due_date: req
            .due_date
            .map(|due| due.as_deref().and_then(parse_due_date)),
    };
    let lookup = id.clone();
    let task = state
        .db
        .call(move |db| db.update_task(&lookup, &update))
        .await?;
    match task {
        Some(task) => Ok(Json(task)),
        None => Err(BoardError::TaskNotFound { id }.into()),
    }
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let deleted = state.db.call(move |db| db.delete_task(&lookup)).await?;
    if !deleted {
        return Err(BoardError::TaskNotFound { id }.into());
    }
    Ok(Json(MessageResponse {
        message: "Task deleted successfully",
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────
