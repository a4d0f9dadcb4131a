use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider status on a profile.
/// 0 = ordinary user, 1 = approved provider, 2 = application pending,
/// 3 = application rejected.
pub type ProviderStatus = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_year: Option<i64>,
    pub is_manager: bool,
    pub is_provider: ProviderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub cover_url: Option<String>,
    pub categories: Vec<String>,
    pub service_areas: Vec<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub store_id: Uuid,
    pub project_title: String,
    pub kind: Option<String>,
    pub area: Option<i64>,
    pub location: Option<String>,
    pub style: Option<String>,
    pub duration: Option<i64>,
    pub personnel: Option<i64>,
    pub tags: Vec<String>,
    pub content: String,
    pub cover_url: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider application review state: 0 pending, 1 approved, 2 rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderApplication {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub business_reg: String,
    pub portfolio_url: Option<String>,
    pub memo: Option<String>,
    pub status: i64,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only direct-message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of a user's room list: the other side of the conversation,
/// the latest message, and how many messages arrived since the user last
/// read the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListItem {
    pub room_id: Uuid,
    pub other_id: Option<Uuid>,
    pub last_content: Option<String>,
    pub last_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
