use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Portfolio, ProviderApplication, Store};

// -- JWT Claims --

/// JWT claims shared across naegong-api (REST middleware) and
/// naegong-gateway (WebSocket authentication). Canonical definition lives
/// here in naegong-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Profiles --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub gender: Option<String>,
    pub address: Option<String>,
    pub birth_year: Option<i64>,
    pub phone_number: Option<String>,
}

// -- Stores --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertStoreRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub items: Vec<Store>,
    pub total: i64,
}

// -- Portfolios --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePortfolioRequest {
    pub store_id: Uuid,
    pub project_title: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub area: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub personnel: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePortfolioRequest {
    pub project_title: Option<String>,
    pub kind: Option<String>,
    pub area: Option<i64>,
    pub location: Option<String>,
    pub style: Option<String>,
    pub duration: Option<i64>,
    pub personnel: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub content: Option<String>,
    pub cover_url: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioListResponse {
    pub items: Vec<Portfolio>,
}

// -- Provider applications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyProviderRequest {
    pub business_reg: String,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub items: Vec<ProviderApplication>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewApplicationRequest {
    pub approve: bool,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub name: String,
    pub size: u64,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRoomRequest {
    pub other_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OpenRoomResponse {
    pub room_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub items: Vec<ChatMessage>,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}
