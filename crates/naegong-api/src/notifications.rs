use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use naegong_types::api::{Claims, UnreadCountResponse};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

const LIST_LIMIT: u32 = 50;

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = run_blocking(move || Ok(db.db.list_notifications(&user_id, LIST_LIMIT)?)).await?;

    let items: Vec<_> = rows.into_iter().map(|row| row.into_model()).collect();
    Ok(Json(items))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let count = run_blocking(move || Ok(db.db.unread_notification_count(&user_id)?)).await?;

    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        db.db.mark_notifications_read(&user_id)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
