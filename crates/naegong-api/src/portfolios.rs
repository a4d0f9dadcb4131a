use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use naegong_db::now_ts;
use naegong_types::api::{
    Claims, CreatePortfolioRequest, PortfolioListResponse, UpdatePortfolioRequest,
};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PortfolioListQuery {
    pub store_id: Option<Uuid>,
}

pub async fn list_portfolios(
    State(state): State<AppState>,
    Query(query): Query<PortfolioListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = run_blocking(move || {
        let store_id = query.store_id.map(|id| id.to_string());
        Ok(db.db.list_published_portfolios(store_id.as_deref())?)
    })
    .await?;

    Ok(Json(PortfolioListResponse {
        items: rows.into_iter().map(|row| row.into_model()).collect(),
    }))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = run_blocking(move || Ok(db.db.get_portfolio(&portfolio_id.to_string())?))
        .await?
        .ok_or_else(|| ApiError::NotFound("portfolio not found".into()))?;

    Ok(Json(row.into_model()))
}

pub async fn create_portfolio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePortfolioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.project_title.trim().is_empty() {
        return Err(ApiError::BadRequest("project_title is required".into()));
    }

    // The target store must belong to the caller (managers may post anywhere)
    let db = state.clone();
    let store_id = req.store_id.to_string();
    let caller = claims.sub.to_string();
    let allowed = run_blocking(move || {
        let store = db
            .db
            .get_store(&store_id)?
            .ok_or_else(|| ApiError::NotFound("store not found".into()))?;
        Ok(store.owner_id == caller || db.db.is_manager(&caller)?)
    })
    .await?;
    if !allowed {
        return Err(ApiError::Forbidden("not the store owner".into()));
    }

    let portfolio_id = Uuid::new_v4();
    let db = state.clone();
    run_blocking(move || {
        db.db.insert_portfolio(
            &portfolio_id.to_string(),
            &req.store_id.to_string(),
            req.project_title.trim(),
            req.kind.as_deref(),
            req.area,
            req.location.as_deref(),
            req.style.as_deref(),
            req.duration,
            req.personnel,
            &req.tags,
            &req.content,
            req.cover_url.as_deref(),
            req.published,
            &now_ts(),
        )?;
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": portfolio_id })),
    ))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePortfolioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner_or_manager(&state, portfolio_id, claims.sub).await?;

    let db = state.clone();
    let changed = run_blocking(move || {
        Ok(db.db.update_portfolio(
            &portfolio_id.to_string(),
            req.project_title.as_deref(),
            req.kind.as_deref(),
            req.area,
            req.location.as_deref(),
            req.style.as_deref(),
            req.duration,
            req.personnel,
            req.tags.as_deref(),
            req.content.as_deref(),
            req.cover_url.as_deref(),
            req.published,
            &now_ts(),
        )?)
    })
    .await?;

    if !changed {
        return Err(ApiError::NotFound("portfolio not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_portfolio(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner_or_manager(&state, portfolio_id, claims.sub).await?;

    let db = state.clone();
    let deleted = run_blocking(move || Ok(db.db.delete_portfolio(&portfolio_id.to_string())?))
        .await?;

    if !deleted {
        return Err(ApiError::NotFound("portfolio not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// A portfolio may be modified by the owner of its store or by a manager.
async fn ensure_owner_or_manager(
    state: &AppState,
    portfolio_id: Uuid,
    caller: Uuid,
) -> Result<(), ApiError> {
    let db = state.clone();
    let caller = caller.to_string();
    let allowed = run_blocking(move || {
        let owner = db
            .db
            .portfolio_store_owner(&portfolio_id.to_string())?
            .ok_or_else(|| ApiError::NotFound("portfolio not found".into()))?;
        Ok(owner == caller || db.db.is_manager(&caller)?)
    })
    .await?;

    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "not the store owner or a manager".into(),
        ))
    }
}
