use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use naegong_types::api::{
    Claims, MessageListResponse, OpenRoomRequest, OpenRoomResponse, SendMessageRequest,
};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

/// POST /chat/rooms — get-or-create the dm room with another user.
pub async fn open_room(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    let me = claims.sub;
    let room_id = run_blocking(move || Ok(chat.ensure_dm_room(me, req.other_id)?)).await?;

    Ok(Json(OpenRoomResponse { room_id }))
}

/// GET /chat/rooms — the caller's room list with unread counts.
pub async fn my_rooms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    let me = claims.sub;
    let items = run_blocking(move || Ok(chat.my_rooms(me)?)).await?;

    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// GET /chat/rooms/{room_id}/messages — history, oldest first.
pub async fn room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    let me = claims.sub;
    let items = run_blocking(move || {
        ensure_participant(&chat, room_id, me)?;
        Ok(chat.room_messages(room_id, query.before, query.limit)?)
    })
    .await?;

    Ok(Json(MessageListResponse { items }))
}

/// POST /chat/rooms/{room_id}/messages — append to the log. A message that
/// trims to nothing is dropped without error (204).
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    let me = claims.sub;
    let sent = run_blocking(move || {
        ensure_participant(&chat, room_id, me)?;
        Ok(chat.send_message(room_id, me, &req.content)?)
    })
    .await?;

    match sent {
        Some(message) => Ok((StatusCode::CREATED, Json(message)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /chat/rooms/{room_id}/read — best-effort read mark; storage
/// failures are logged, the viewer still gets a 204.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    let me = claims.sub;
    run_blocking(move || {
        ensure_participant(&chat, room_id, me)?;
        chat.mark_room_read_detached(room_id, me);
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn ensure_participant(
    chat: &naegong_chat::ChatService,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    if chat.is_participant(room_id, user_id)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not a participant of this room".into()))
    }
}
