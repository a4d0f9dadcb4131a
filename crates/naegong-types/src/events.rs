use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChatMessage;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A new chat message was appended to a room's log
    MessageCreate {
        id: Uuid,
        room_id: Uuid,
        sender_id: Uuid,
        content: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// A notification row was created for a specific user
    NotificationCreate {
        id: Uuid,
        kind: String,
        body: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },
}

impl GatewayEvent {
    /// Returns the room_id if this event is scoped to a specific chat room.
    /// Events that return `None` are not room-scoped; they are either global
    /// or delivered over the per-user channel.
    pub fn room_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { room_id, .. } => Some(*room_id),
            // Ready and NotificationCreate are connection/user scoped
            _ => None,
        }
    }

    pub fn message_created(message: &ChatMessage) -> Self {
        Self::MessageCreate {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to message events for specific rooms.
    /// The server only forwards room-scoped events for rooms the client
    /// has subscribed to; each Subscribe replaces the previous set.
    Subscribe { room_ids: Vec<Uuid> },
}
