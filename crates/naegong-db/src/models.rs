//! Database row types — these map directly to SQLite rows.
//! Distinct from the naegong-types API models to keep the DB layer
//! independent; `into_model` converts at the boundary, logging (not
//! failing) on corrupt stored values.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use naegong_types::models::{
    ChatMessage, Notification, Portfolio, Profile, ProviderApplication, RoomListItem, Store,
};

pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_year: Option<i64>,
    pub is_manager: bool,
    pub is_provider: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct StoreRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub cover_url: Option<String>,
    pub categories: String,
    pub service_areas: String,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct PortfolioRow {
    pub id: String,
    pub store_id: String,
    pub project_title: String,
    pub kind: Option<String>,
    pub area: Option<i64>,
    pub location: Option<String>,
    pub style: Option<String>,
    pub duration: Option<i64>,
    pub personnel: Option<i64>,
    pub tags: String,
    pub content: String,
    pub cover_url: Option<String>,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ApplicationRow {
    pub id: String,
    pub applicant_id: String,
    pub business_reg: String,
    pub portfolio_url: Option<String>,
    pub memo: Option<String>,
    pub status: i64,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

pub struct ParticipantRow {
    pub room_id: String,
    pub user_id: String,
    pub last_read_at: Option<String>,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

/// One row of the single-statement room-list aggregation.
pub struct RoomListRow {
    pub room_id: String,
    pub other_id: Option<String>,
    pub last_content: Option<String>,
    pub last_at: Option<String>,
    pub unread_count: i64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(value: &str, what: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Legacy SQLite timestamps have the form 'YYYY-MM-DD HH:MM:SS'
            // without a timezone; parse as naive UTC.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|n| n.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, value, e);
            DateTime::default()
        })
}

fn parse_list(value: &str, what: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Vec::new()
    })
}

impl ProfileRow {
    pub fn into_model(self) -> Profile {
        Profile {
            id: parse_uuid(&self.id, "profile id"),
            username: self.username,
            phone_number: self.phone_number,
            address: self.address,
            gender: self.gender,
            birth_year: self.birth_year,
            is_manager: self.is_manager,
            is_provider: self.is_provider,
            created_at: parse_ts(&self.created_at, "profile created_at"),
            updated_at: parse_ts(&self.updated_at, "profile updated_at"),
        }
    }
}

impl StoreRow {
    pub fn into_model(self) -> Store {
        Store {
            id: parse_uuid(&self.id, "store id"),
            owner_id: parse_uuid(&self.owner_id, "store owner_id"),
            name: self.name,
            description: self.description,
            phone: self.phone,
            address: self.address,
            logo_url: self.logo_url,
            cover_url: self.cover_url,
            categories: parse_list(&self.categories, "store categories"),
            service_areas: parse_list(&self.service_areas, "store service_areas"),
            is_published: self.is_published,
            created_at: parse_ts(&self.created_at, "store created_at"),
            updated_at: parse_ts(&self.updated_at, "store updated_at"),
        }
    }
}

impl PortfolioRow {
    pub fn into_model(self) -> Portfolio {
        Portfolio {
            id: parse_uuid(&self.id, "portfolio id"),
            store_id: parse_uuid(&self.store_id, "portfolio store_id"),
            project_title: self.project_title,
            kind: self.kind,
            area: self.area,
            location: self.location,
            style: self.style,
            duration: self.duration,
            personnel: self.personnel,
            tags: parse_list(&self.tags, "portfolio tags"),
            content: self.content,
            cover_url: self.cover_url,
            published: self.published,
            created_at: parse_ts(&self.created_at, "portfolio created_at"),
            updated_at: parse_ts(&self.updated_at, "portfolio updated_at"),
        }
    }
}

impl ApplicationRow {
    pub fn into_model(self) -> ProviderApplication {
        ProviderApplication {
            id: parse_uuid(&self.id, "application id"),
            applicant_id: parse_uuid(&self.applicant_id, "application applicant_id"),
            business_reg: self.business_reg,
            portfolio_url: self.portfolio_url,
            memo: self.memo,
            status: self.status,
            created_at: parse_ts(&self.created_at, "application created_at"),
        }
    }
}

impl MessageRow {
    pub fn into_model(self) -> ChatMessage {
        ChatMessage {
            id: parse_uuid(&self.id, "message id"),
            room_id: parse_uuid(&self.room_id, "message room_id"),
            sender_id: parse_uuid(&self.sender_id, "message sender_id"),
            content: self.content,
            created_at: parse_ts(&self.created_at, "message created_at"),
        }
    }
}

impl NotificationRow {
    pub fn into_model(self) -> Notification {
        Notification {
            id: parse_uuid(&self.id, "notification id"),
            user_id: parse_uuid(&self.user_id, "notification user_id"),
            kind: self.kind,
            body: self.body,
            is_read: self.is_read,
            created_at: parse_ts(&self.created_at, "notification created_at"),
        }
    }
}

impl RoomListRow {
    pub fn into_model(self) -> RoomListItem {
        RoomListItem {
            room_id: parse_uuid(&self.room_id, "room id"),
            other_id: self.other_id.as_deref().map(|v| parse_uuid(v, "room other_id")),
            last_content: self.last_content,
            last_at: self.last_at.as_deref().map(|v| parse_ts(v, "room last_at")),
            unread_count: self.unread_count,
        }
    }
}
