use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use naegong_db::now_ts;
use naegong_types::api::{Claims, StoreListResponse, UpsertStoreRequest};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 12;
const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct StoreListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Public storefront listing: published stores only, optional category and
/// name filters, newest first.
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let per_page = query.per_page.clamp(1, MAX_PAGE_SIZE);
    let offset = query.page.saturating_sub(1).saturating_mul(per_page);

    let db = state.clone();
    let (rows, total) = run_blocking(move || {
        Ok(db.db.list_published_stores(
            query.category.as_deref(),
            query.q.as_deref(),
            per_page,
            offset,
        )?)
    })
    .await?;

    Ok(Json(StoreListResponse {
        items: rows.into_iter().map(|row| row.into_model()).collect(),
        total,
    }))
}

pub async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let store = run_blocking(move || Ok(db.db.get_store(&store_id.to_string())?))
        .await?
        .ok_or_else(|| ApiError::NotFound("store not found".into()))?;

    Ok(Json(store.into_model()))
}

/// The caller's own store, published or not.
pub async fn get_my_store(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let owner_id = claims.sub.to_string();
    let store = run_blocking(move || Ok(db.db.get_store_by_owner(&owner_id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("no store registered".into()))?;

    Ok(Json(store.into_model()))
}

/// Register or update the caller's store. One store per owner; a second
/// registration overwrites the first.
pub async fn upsert_my_store(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertStoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("store name is required".into()));
    }

    let db = state.clone();
    let owner_id = claims.sub.to_string();
    let store_id = run_blocking(move || {
        Ok(db.db.upsert_store(
            &Uuid::new_v4().to_string(),
            &owner_id,
            req.name.trim(),
            req.description.as_deref(),
            req.phone.as_deref(),
            req.address.as_deref(),
            req.logo_url.as_deref(),
            req.cover_url.as_deref(),
            &req.categories,
            &req.service_areas,
            req.is_published,
            &now_ts(),
        )?)
    })
    .await?;

    let db = state.clone();
    let store = run_blocking(move || Ok(db.db.get_store(&store_id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("store not found after upsert".into()))?;

    Ok(Json(store.into_model()))
}
