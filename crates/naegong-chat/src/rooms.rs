//! Room resolution and the room-list aggregation.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use naegong_db::chat::DmRoomInsert;
use naegong_db::{is_busy, now_ts};
use naegong_types::models::RoomListItem;

use crate::{ChatError, ChatService};

/// How often a resolver attempt is retried when SQLite reports a transient
/// BUSY, and the pause between attempts.
const BUSY_RETRIES: u32 = 3;
const BUSY_BACKOFF: Duration = Duration::from_millis(25);

/// Canonical dm pair key: the two ids sorted, joined with ':'. Both sides
/// of a conversation derive the same key regardless of who initiates.
pub fn pair_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", lo, hi)
}

/// How the room list is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomListStrategy {
    /// One SQL statement with correlated subqueries.
    Aggregate,
    /// Per-room composition: memberships, other participants, latest
    /// message and unread count per room. N+1 queries; kept as the
    /// resilience path, not the fast one.
    Compose,
}

impl ChatService {
    /// Get-or-create the direct-message room for `me` and `other`.
    ///
    /// Idempotent: both participants resolving concurrently end up with the
    /// same room — the UNIQUE pair key makes the losing insert conflict,
    /// after which the loser re-reads the winner's row. Only transient
    /// BUSY errors are retried; everything else surfaces unchanged.
    pub fn ensure_dm_room(&self, me: Uuid, other: Uuid) -> Result<Uuid, ChatError> {
        if me.is_nil() || other.is_nil() {
            return Err(ChatError::invalid("invalid user ids"));
        }
        if me == other {
            return Err(ChatError::invalid(
                "cannot open a direct-message room with yourself",
            ));
        }

        let key = pair_key(me, other);
        let mut busy_attempts = 0;
        let mut race_rounds = 0;

        loop {
            match self.try_resolve(&key, me, other) {
                Ok(Some(room_id)) => return Ok(room_id),
                Ok(None) => {
                    // lost the creation race; the next read finds the winner
                    race_rounds += 1;
                    if race_rounds > BUSY_RETRIES {
                        return Err(ChatError::Storage(anyhow::anyhow!(
                            "dm room for pair {} kept conflicting without becoming readable",
                            key
                        )));
                    }
                }
                Err(ChatError::Storage(err)) if is_busy(&err) && busy_attempts < BUSY_RETRIES => {
                    busy_attempts += 1;
                    warn!(
                        "dm room resolve busy (attempt {}/{}), retrying",
                        busy_attempts, BUSY_RETRIES
                    );
                    std::thread::sleep(BUSY_BACKOFF);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One resolve round: read, else create. `Ok(None)` means a concurrent
    /// creator won and the caller should re-read.
    fn try_resolve(&self, key: &str, me: Uuid, other: Uuid) -> Result<Option<Uuid>, ChatError> {
        if let Some(existing) = self.db().find_dm_room(key)? {
            return Ok(Some(parse_room_id(&existing)?));
        }

        let room_id = Uuid::new_v4();
        match self.db().create_dm_room(
            &room_id.to_string(),
            key,
            &me.to_string(),
            &other.to_string(),
            &now_ts(),
        )? {
            DmRoomInsert::Created => Ok(Some(room_id)),
            DmRoomInsert::PairExists => Ok(None),
        }
    }

    /// The caller's room list: per room the other participant, the latest
    /// message, and the unread count, ordered by latest activity (rooms
    /// without messages last). Tries the single-statement aggregation and
    /// falls back to per-room composition when it fails.
    pub fn my_rooms(&self, me: Uuid) -> Result<Vec<RoomListItem>, ChatError> {
        match self.my_rooms_with(RoomListStrategy::Aggregate, me) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!("room-list aggregation failed ({}), composing per room", err);
                self.my_rooms_with(RoomListStrategy::Compose, me)
            }
        }
    }

    pub fn my_rooms_with(
        &self,
        strategy: RoomListStrategy,
        me: Uuid,
    ) -> Result<Vec<RoomListItem>, ChatError> {
        match strategy {
            RoomListStrategy::Aggregate => {
                let rows = self.db().my_rooms_aggregate(&me.to_string())?;
                Ok(rows.into_iter().map(|row| row.into_model()).collect())
            }
            RoomListStrategy::Compose => self.compose_rooms(me),
        }
    }

    fn compose_rooms(&self, me: Uuid) -> Result<Vec<RoomListItem>, ChatError> {
        let me_str = me.to_string();
        let memberships = self.db().room_memberships(&me_str)?;
        if memberships.is_empty() {
            return Ok(vec![]);
        }

        let room_ids: Vec<String> = memberships.iter().map(|p| p.room_id.clone()).collect();
        let others = self.db().rooms_other_participants(&room_ids, &me_str)?;

        let mut items = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            let other_id = others
                .iter()
                .find(|o| o.room_id == membership.room_id)
                .map(|o| o.user_id.clone());

            let latest = self.db().latest_room_message(&membership.room_id)?;
            let unread = self.db().unread_count(
                &membership.room_id,
                &me_str,
                membership.last_read_at.as_deref(),
            )?;

            let (last_content, last_at) = match latest {
                Some((content, at)) => (Some(content), Some(at)),
                None => (None, None),
            };

            items.push(
                naegong_db::models::RoomListRow {
                    room_id: membership.room_id.clone(),
                    other_id,
                    last_content,
                    last_at,
                    unread_count: unread,
                }
                .into_model(),
            );
        }

        // latest activity first; message-less rooms count as epoch
        items.sort_by(|a, b| {
            let ta = a.last_at.unwrap_or_default();
            let tb = b.last_at.unwrap_or_default();
            tb.cmp(&ta)
        });

        Ok(items)
    }
}

fn parse_room_id(value: &str) -> Result<Uuid, ChatError> {
    value
        .parse()
        .map_err(|e| ChatError::Storage(anyhow::anyhow!("corrupt room id '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use naegong_db::Database;
    use naegong_gateway::dispatcher::Dispatcher;

    use super::{pair_key, RoomListStrategy};
    use crate::{ChatError, ChatService};

    fn service() -> (ChatService, Uuid, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (user, name) in users.iter().zip(["alice", "bob", "carol"]) {
            db.create_profile(&user.to_string(), name, "hash", &naegong_db::now_ts())
                .unwrap();
        }
        let service = ChatService::new(Arc::new(db), Dispatcher::new());
        (service, users[0], users[1], users[2])
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(pair_key(a, b), pair_key(b, a));
        assert_ne!(pair_key(a, b), pair_key(a, a));
    }

    #[test]
    fn test_resolver_is_idempotent_over_the_pair() {
        let (service, alice, bob, _) = service();

        let first = service.ensure_dm_room(alice, bob).unwrap();
        let again = service.ensure_dm_room(alice, bob).unwrap();
        // and from the other side
        let reversed = service.ensure_dm_room(bob, alice).unwrap();

        assert_eq!(first, again);
        assert_eq!(first, reversed);
    }

    #[test]
    fn test_resolver_rejects_self_dm() {
        let (service, alice, _, _) = service();
        let err = service.ensure_dm_room(alice, alice).unwrap_err();
        assert!(matches!(err, ChatError::InvalidOperation(_)));

        let err = service.ensure_dm_room(Uuid::nil(), alice).unwrap_err();
        assert!(matches!(err, ChatError::InvalidOperation(_)));
    }

    #[test]
    fn test_room_list_orders_by_latest_message() {
        let (service, alice, bob, carol) = service();

        let with_bob = service.ensure_dm_room(alice, bob).unwrap();
        let with_carol = service.ensure_dm_room(alice, carol).unwrap();

        service.send_message(with_bob, bob, "older").unwrap();
        service.send_message(with_carol, carol, "newer").unwrap();

        for strategy in [RoomListStrategy::Aggregate, RoomListStrategy::Compose] {
            let rooms = service.my_rooms_with(strategy, alice).unwrap();
            assert_eq!(rooms.len(), 2, "strategy {:?}", strategy);
            assert_eq!(rooms[0].room_id, with_carol);
            assert_eq!(rooms[0].other_id, Some(carol));
            assert_eq!(rooms[0].last_content.as_deref(), Some("newer"));
            assert_eq!(rooms[0].unread_count, 1);
            assert_eq!(rooms[1].room_id, with_bob);
        }
    }

    #[test]
    fn test_room_list_puts_message_less_rooms_last() {
        let (service, alice, bob, carol) = service();

        let quiet = service.ensure_dm_room(alice, bob).unwrap();
        let active = service.ensure_dm_room(alice, carol).unwrap();
        service.send_message(active, carol, "hello").unwrap();

        for strategy in [RoomListStrategy::Aggregate, RoomListStrategy::Compose] {
            let rooms = service.my_rooms_with(strategy, alice).unwrap();
            assert_eq!(rooms[0].room_id, active, "strategy {:?}", strategy);
            assert_eq!(rooms[1].room_id, quiet);
            assert_eq!(rooms[1].last_content, None);
            assert_eq!(rooms[1].last_at, None);
        }
    }

    #[test]
    fn test_fallback_matches_aggregate() {
        let (service, alice, bob, carol) = service();

        let r1 = service.ensure_dm_room(alice, bob).unwrap();
        let r2 = service.ensure_dm_room(alice, carol).unwrap();
        service.send_message(r1, bob, "one").unwrap();
        service.send_message(r1, alice, "two").unwrap();
        service.send_message(r2, carol, "three").unwrap();
        service.mark_room_read(r1, alice).unwrap();

        let aggregate = service
            .my_rooms_with(RoomListStrategy::Aggregate, alice)
            .unwrap();
        let composed = service
            .my_rooms_with(RoomListStrategy::Compose, alice)
            .unwrap();

        assert_eq!(aggregate.len(), composed.len());
        for (a, c) in aggregate.iter().zip(&composed) {
            assert_eq!(a.room_id, c.room_id);
            assert_eq!(a.other_id, c.other_id);
            assert_eq!(a.last_content, c.last_content);
            assert_eq!(a.unread_count, c.unread_count);
        }
    }
}
