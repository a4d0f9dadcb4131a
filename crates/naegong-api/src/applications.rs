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
    ApplicationListResponse, ApplyProviderRequest, Claims, ReviewApplicationRequest,
};
use naegong_types::events::GatewayEvent;

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

/// Profile is_provider values: 1 approved, 2 pending, 3 rejected.
const PROVIDER_APPROVED: i64 = 1;
const PROVIDER_PENDING: i64 = 2;
const PROVIDER_REJECTED: i64 = 3;

/// Application status values: 1 approved, 2 rejected (0 pending).
const STATUS_APPROVED: i64 = 1;
const STATUS_REJECTED: i64 = 2;

pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ApplyProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.business_reg.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "business registration document is required".into(),
        ));
    }

    let application_id = Uuid::new_v4();
    let db = state.clone();
    let applicant = claims.sub.to_string();
    run_blocking(move || {
        let now = now_ts();
        db.db.insert_application(
            &application_id.to_string(),
            &applicant,
            req.business_reg.trim(),
            req.portfolio_url.as_deref(),
            req.memo.as_deref(),
            &now,
        )?;
        db.db.set_provider_status(&applicant, PROVIDER_PENDING, &now)?;
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": application_id })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
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
    10
}

pub async fn list_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_manager(&state, claims.sub).await?;

    let per_page = query.per_page.clamp(1, 50);
    let offset = query.page.saturating_sub(1).saturating_mul(per_page);

    let db = state.clone();
    let (rows, total) = run_blocking(move || {
        Ok(db
            .db
            .list_pending_applications(query.q.as_deref(), per_page, offset)?)
    })
    .await?;

    Ok(Json(ApplicationListResponse {
        items: rows.into_iter().map(|row| row.into_model()).collect(),
        total,
    }))
}

pub async fn review(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_manager(&state, claims.sub).await?;

    let (status, provider_status, verdict) = if req.approve {
        (STATUS_APPROVED, PROVIDER_APPROVED, "approved")
    } else {
        (STATUS_REJECTED, PROVIDER_REJECTED, "rejected")
    };
    let body = format!("Your provider application was {}", verdict);

    let db = state.clone();
    let notification_id = Uuid::new_v4();
    let notification_body = body.clone();
    let applicant = run_blocking(move || {
        let application = db
            .db
            .get_application(&application_id.to_string())?
            .ok_or_else(|| ApiError::NotFound("application not found".into()))?;
        if application.status != 0 {
            return Err(ApiError::Conflict("application already reviewed".into()));
        }

        let now = now_ts();
        db.db.set_application_status(&application.id, status)?;
        db.db
            .set_provider_status(&application.applicant_id, provider_status, &now)?;
        db.db.insert_notification(
            &notification_id.to_string(),
            &application.applicant_id,
            "application",
            &notification_body,
            &now,
        )?;

        Ok(application.applicant_id)
    })
    .await?;

    if let Ok(applicant_id) = applicant.parse::<Uuid>() {
        state
            .dispatcher
            .send_to_user(
                applicant_id,
                GatewayEvent::NotificationCreate {
                    id: notification_id,
                    kind: "application".into(),
                    body,
                    created_at: chrono::Utc::now(),
                },
            )
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_manager(state: &AppState, caller: Uuid) -> Result<(), ApiError> {
    let db = state.clone();
    let caller = caller.to_string();
    let is_manager = run_blocking(move || Ok(db.db.is_manager(&caller)?)).await?;
    if is_manager {
        Ok(())
    } else {
        Err(ApiError::Forbidden("manager role required".into()))
    }
}
