use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use naegong_db::now_ts;
use naegong_types::api::{Claims, UpdateProfileRequest};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let profile = run_blocking(move || Ok(db.db.get_profile_by_id(&id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".into()))?;

    Ok(Json(profile.into_model()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let changed = run_blocking(move || {
        Ok(db.db.update_profile(
            &id,
            req.gender.as_deref(),
            req.address.as_deref(),
            req.birth_year,
            req.phone_number.as_deref(),
            &now_ts(),
        )?)
    })
    .await?;

    if !changed {
        return Err(ApiError::NotFound("profile not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
