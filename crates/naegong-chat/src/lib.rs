//! Direct-message chat service: room resolution, the message log, read
//! tracking, room-list aggregation, and realtime subscriptions.

pub mod error;
pub mod messages;
pub mod rooms;

use std::sync::Arc;

use uuid::Uuid;

use naegong_db::Database;
use naegong_gateway::dispatcher::{Dispatcher, SubscriptionHandle};
use naegong_types::models::ChatMessage;

pub use error::ChatError;
pub use rooms::RoomListStrategy;

#[derive(Clone)]
pub struct ChatService {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl ChatService {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Whether `user_id` belongs to the room. API handlers gate history,
    /// send, and read-tracking on this.
    pub fn is_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool, ChatError> {
        Ok(self
            .db
            .is_room_participant(&room_id.to_string(), &user_id.to_string())?)
    }

    /// Feed of new messages in one room. Each insert published while the
    /// subscription is live reaches `callback` in arrival order; events a
    /// lagged receiver missed are skipped, not replayed. The returned handle
    /// cancels the feed; cancelling twice (or dropping after cancel) is safe.
    pub fn subscribe_room<F>(&self, room_id: Uuid, callback: F) -> SubscriptionHandle
    where
        F: FnMut(ChatMessage) + Send + 'static,
    {
        self.dispatcher.subscribe_room(room_id, callback)
    }
}
