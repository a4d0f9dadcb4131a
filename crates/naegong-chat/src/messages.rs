//! The append-only message log: sending, history paging, read tracking.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use naegong_db::now_ts;
use naegong_types::events::GatewayEvent;
use naegong_types::models::ChatMessage;

use crate::{ChatError, ChatService};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

impl ChatService {
    /// Append one message to a room's log and publish it to subscribers.
    ///
    /// The text is trimmed first; a whitespace-only message is silently
    /// dropped (`Ok(None)`), which is a no-op rather than an error.
    pub fn send_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Option<ChatMessage>, ChatError> {
        let text = content.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let ts = now_ts();
        self.db()
            .insert_chat_message(&id.to_string(), &room_id.to_string(), &sender_id.to_string(), text, &ts)?;

        let message = ChatMessage {
            id,
            room_id,
            sender_id,
            content: text.to_string(),
            created_at: ts.parse().unwrap_or_else(|_| Utc::now()),
        };

        self.dispatcher()
            .broadcast(GatewayEvent::message_created(&message));

        Ok(Some(message))
    }

    /// Up to `limit` messages (default 50, capped at 200) created strictly
    /// before the cursor, oldest first. The storage fetch is descending so
    /// the limit keeps the most recent slice; the result is reversed before
    /// returning.
    pub fn room_messages(
        &self,
        room_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
        let cursor = before.map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true));

        let mut rows =
            self.db()
                .room_messages(&room_id.to_string(), limit, cursor.as_deref())?;
        rows.reverse();

        Ok(rows.into_iter().map(|row| row.into_model()).collect())
    }

    /// Move the caller's last-read mark for the room to now. Returns false
    /// when the caller has no participant row in the room.
    pub fn mark_room_read(&self, room_id: Uuid, user_id: Uuid) -> Result<bool, ChatError> {
        Ok(self
            .db()
            .set_last_read(&room_id.to_string(), &user_id.to_string(), &now_ts())?)
    }

    /// Best-effort read tracking for the receive path: failures are logged,
    /// never surfaced.
    pub fn mark_room_read_detached(&self, room_id: Uuid, user_id: Uuid) {
        if let Err(err) = self.mark_room_read(room_id, user_id) {
            warn!(
                "failed to mark room {} read for {}: {}",
                room_id, user_id, err
            );
        }
    }

    /// Unread count for one user in one room, derived from the message log
    /// and the participant's last-read mark.
    pub fn unread_count(&self, room_id: Uuid, user_id: Uuid) -> Result<i64, ChatError> {
        let me = user_id.to_string();
        let last_read = self
            .db()
            .room_memberships(&me)?
            .into_iter()
            .find(|p| p.room_id == room_id.to_string())
            .and_then(|p| p.last_read_at);

        Ok(self
            .db()
            .unread_count(&room_id.to_string(), &me, last_read.as_deref())?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use naegong_db::Database;
    use naegong_gateway::dispatcher::Dispatcher;

    use crate::ChatService;

    fn service() -> (ChatService, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for (user, name) in [(alice, "alice"), (bob, "bob")] {
            db.create_profile(&user.to_string(), name, "hash", &naegong_db::now_ts())
                .unwrap();
        }
        (ChatService::new(Arc::new(db), Dispatcher::new()), alice, bob)
    }

    #[test]
    fn test_whitespace_only_message_is_dropped() {
        let (service, alice, bob) = service();
        let room = service.ensure_dm_room(alice, bob).unwrap();

        assert!(service.send_message(room, alice, "   \n\t ").unwrap().is_none());
        assert!(service.room_messages(room, None, None).unwrap().is_empty());

        // and trimming applies to what does get stored
        let sent = service
            .send_message(room, alice, "  hello  ")
            .unwrap()
            .unwrap();
        assert_eq!(sent.content, "hello");
    }

    #[test]
    fn test_history_limit_returns_most_recent_oldest_first() {
        let (service, alice, bob) = service();
        let room = service.ensure_dm_room(alice, bob).unwrap();

        // fixed timestamps so ordering is not at the mercy of the clock
        for i in 1..=5 {
            service
                .db()
                .insert_chat_message(
                    &Uuid::new_v4().to_string(),
                    &room.to_string(),
                    &alice.to_string(),
                    &format!("msg {}", i),
                    &format!("2026-01-01T00:00:0{}.000000Z", i),
                )
                .unwrap();
        }

        let page = service.room_messages(room, None, Some(2)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "msg 4");
        assert_eq!(page[1].content, "msg 5");

        // paging back from the oldest of that page
        let older = service
            .room_messages(room, Some(page[0].created_at), Some(10))
            .unwrap();
        assert_eq!(older.len(), 3);
        assert_eq!(older[0].content, "msg 1");
        assert_eq!(older[2].content, "msg 3");
    }

    #[test]
    fn test_read_tracking_resets_unread() {
        let (service, alice, bob) = service();
        let room = service.ensure_dm_room(alice, bob).unwrap();

        service.send_message(room, alice, "first").unwrap();
        assert_eq!(service.unread_count(room, bob).unwrap(), 1);

        assert!(service.mark_room_read(room, bob).unwrap());
        assert_eq!(service.unread_count(room, bob).unwrap(), 0);

        // a message after the mark counts again
        service.send_message(room, alice, "second").unwrap();
        assert_eq!(service.unread_count(room, bob).unwrap(), 1);
    }

    #[test]
    fn test_read_tracking_for_non_participant_is_a_noop() {
        let (service, alice, bob) = service();
        let room = service.ensure_dm_room(alice, bob).unwrap();
        let stranger = Uuid::new_v4();

        assert!(!service.mark_room_read(room, stranger).unwrap());
        // detached variant swallows the outcome entirely
        service.mark_room_read_detached(room, stranger);
    }

    #[test]
    fn test_first_contact_end_to_end() {
        let (service, alice, bob) = service();

        // no shared room yet -> resolve creates one
        let room = service.ensure_dm_room(alice, bob).unwrap();

        service.send_message(room, alice, "hello").unwrap();
        let history = service.room_messages(room, None, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[0].sender_id, alice);

        assert!(service.mark_room_read(room, bob).unwrap());
        assert_eq!(service.unread_count(room, bob).unwrap(), 0);

        service.send_message(room, alice, "are you there?").unwrap();
        assert_eq!(service.unread_count(room, bob).unwrap(), 1);

        // the sender's own view stays clean
        assert_eq!(service.unread_count(room, alice).unwrap(), 0);
    }
}
