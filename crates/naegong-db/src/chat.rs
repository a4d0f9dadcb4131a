//! Chat tables: rooms, participants, the append-only message log.

use crate::models::{MessageRow, ParticipantRow, RoomListRow};
use crate::{is_unique_violation, Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;

/// Outcome of a dm-room creation attempt.
pub enum DmRoomInsert {
    Created,
    /// Another caller created the room for this pair first; re-read to get
    /// the winner's id.
    PairExists,
}

/// Epoch stand-in for "never read": every stored timestamp compares greater.
pub const EPOCH_TS: &str = "1970-01-01";

impl Database {
    // -- Rooms --

    pub fn find_dm_room(&self, pair_key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM chat_rooms WHERE pair_key = ?1",
                    [pair_key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    /// Create a dm room plus both participant rows in one transaction.
    /// A UNIQUE violation on pair_key means a concurrent caller won the
    /// race; that is reported as `PairExists`, every other error bubbles up.
    pub fn create_dm_room(
        &self,
        room_id: &str,
        pair_key: &str,
        user_a: &str,
        user_b: &str,
        now: &str,
    ) -> Result<DmRoomInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO chat_rooms (id, room_type, pair_key, created_at)
                 VALUES (?1, 'dm', ?2, ?3)",
                rusqlite::params![room_id, pair_key, now],
            );
            if let Err(err) = inserted {
                if is_unique_violation(&err) {
                    return Ok(DmRoomInsert::PairExists);
                }
                return Err(err.into());
            }

            tx.execute(
                "INSERT INTO chat_room_participants (room_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3), (?1, ?4, ?3)",
                rusqlite::params![room_id, user_a, now, user_b],
            )?;

            tx.commit()?;
            Ok(DmRoomInsert::Created)
        })
    }

    pub fn is_room_participant(&self, room_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM chat_room_participants WHERE room_id = ?1 AND user_id = ?2",
                    [room_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Messages --

    pub fn insert_chat_message(
        &self,
        id: &str,
        room_id: &str,
        sender_id: &str,
        content: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, room_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, room_id, sender_id, content, now],
            )?;
            Ok(())
        })
    }

    /// Most recent messages first; the caller reverses for display order.
    /// `before` is an exclusive created_at cursor for paging further back.
    pub fn room_messages(
        &self,
        room_id: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_room_messages(conn, room_id, limit, before))
    }

    pub fn latest_room_message(&self, room_id: &str) -> Result<Option<(String, String)>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT content, created_at FROM chat_messages
                     WHERE room_id = ?1 ORDER BY created_at DESC LIMIT 1",
                    [room_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Messages from the other side newer than the viewer's last read mark.
    pub fn unread_count(
        &self,
        room_id: &str,
        user_id: &str,
        last_read_at: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM chat_messages
                 WHERE room_id = ?1 AND sender_id <> ?2 AND created_at > ?3",
                rusqlite::params![room_id, user_id, last_read_at.unwrap_or(EPOCH_TS)],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Participants --

    /// Returns false when the (room, user) participant row does not exist.
    pub fn set_last_read(&self, room_id: &str, user_id: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chat_room_participants SET last_read_at = ?3
                 WHERE room_id = ?1 AND user_id = ?2",
                rusqlite::params![room_id, user_id, now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn room_memberships(&self, user_id: &str) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT room_id, user_id, last_read_at FROM chat_room_participants
                 WHERE user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ParticipantRow {
                        room_id: row.get(0)?,
                        user_id: row.get(1)?,
                        last_read_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the other participant of each room in `room_ids`.
    pub fn rooms_other_participants(
        &self,
        room_ids: &[String],
        user_id: &str,
    ) -> Result<Vec<ParticipantRow>> {
        if room_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=room_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT room_id, user_id, last_read_at FROM chat_room_participants
                 WHERE user_id <> ?1 AND room_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            for id in room_ids {
                params.push(id);
            }

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ParticipantRow {
                        room_id: row.get(0)?,
                        user_id: row.get(1)?,
                        last_read_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Room list aggregation --

    /// The whole room list in one statement: other participant, latest
    /// message, unread count per room, ordered by latest activity with
    /// message-less rooms last.
    pub fn my_rooms_aggregate(&self, user_id: &str) -> Result<Vec<RoomListRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM (
                    SELECT
                        p.room_id,
                        (SELECT o.user_id FROM chat_room_participants o
                          WHERE o.room_id = p.room_id AND o.user_id <> ?1 LIMIT 1) AS other_id,
                        (SELECT m.content FROM chat_messages m
                          WHERE m.room_id = p.room_id
                          ORDER BY m.created_at DESC LIMIT 1) AS last_content,
                        (SELECT m.created_at FROM chat_messages m
                          WHERE m.room_id = p.room_id
                          ORDER BY m.created_at DESC LIMIT 1) AS last_at,
                        (SELECT COUNT(*) FROM chat_messages m
                          WHERE m.room_id = p.room_id AND m.sender_id <> ?1
                            AND m.created_at > COALESCE(p.last_read_at, ?2)) AS unread_count
                    FROM chat_room_participants p
                    WHERE p.user_id = ?1
                 )
                 ORDER BY COALESCE(last_at, ?2) DESC",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, EPOCH_TS], |row| {
                    Ok(RoomListRow {
                        room_id: row.get("room_id")?,
                        other_id: row.get("other_id")?,
                        last_content: row.get("last_content")?,
                        last_at: row.get("last_at")?,
                        unread_count: row.get("unread_count")?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_room_messages(
    conn: &Connection,
    room_id: &str,
    limit: u32,
    before: Option<&str>,
) -> Result<Vec<MessageRow>> {
    let (sql, params): (&str, Vec<&dyn rusqlite::types::ToSql>) = match before {
        Some(ref before) => (
            "SELECT id, room_id, sender_id, content, created_at FROM chat_messages
             WHERE room_id = ?1 AND created_at < ?2
             ORDER BY created_at DESC LIMIT ?3",
            vec![&room_id, before, &limit],
        ),
        None => (
            "SELECT id, room_id, sender_id, content, created_at FROM chat_messages
             WHERE room_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
            vec![&room_id, &limit],
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                room_id: row.get(1)?,
                sender_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::DmRoomInsert;
    use crate::Database;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in [("u1", "alice"), ("u2", "bob"), ("u3", "carol")] {
            db.create_profile(id, name, "hash", "2026-01-01T00:00:00.000000Z")
                .unwrap();
        }
        db
    }

    #[test]
    fn test_dm_room_create_and_conflict() {
        let db = db();

        let outcome = db
            .create_dm_room("r1", "u1:u2", "u1", "u2", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        assert!(matches!(outcome, DmRoomInsert::Created));

        // second insert for the same pair loses on the unique key
        let outcome = db
            .create_dm_room("r2", "u1:u2", "u1", "u2", "2026-01-01T00:00:01.000000Z")
            .unwrap();
        assert!(matches!(outcome, DmRoomInsert::PairExists));

        assert_eq!(db.find_dm_room("u1:u2").unwrap().as_deref(), Some("r1"));
        // the losing transaction rolled back: no orphan participants
        assert!(db.is_room_participant("r1", "u1").unwrap());
        assert!(db.is_room_participant("r1", "u2").unwrap());
        assert!(!db.is_room_participant("r2", "u1").unwrap());
    }

    #[test]
    fn test_message_log_cursor() {
        let db = db();
        db.create_dm_room("r1", "u1:u2", "u1", "u2", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        for i in 1..=5 {
            db.insert_chat_message(
                &format!("m{}", i),
                "r1",
                "u1",
                &format!("msg {}", i),
                &format!("2026-01-01T00:00:0{}.000000Z", i),
            )
            .unwrap();
        }

        let rows = db.room_messages("r1", 2, None).unwrap();
        assert_eq!(rows.len(), 2);
        // descending: newest first
        assert_eq!(rows[0].id, "m5");
        assert_eq!(rows[1].id, "m4");

        let rows = db
            .room_messages("r1", 10, Some("2026-01-01T00:00:04.000000Z"))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "m3");
    }

    #[test]
    fn test_unread_count_epoch_default() {
        let db = db();
        db.create_dm_room("r1", "u1:u2", "u1", "u2", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        db.insert_chat_message("m1", "r1", "u1", "hello", "2026-01-01T00:00:01.000000Z")
            .unwrap();
        db.insert_chat_message("m2", "r1", "u2", "hi", "2026-01-01T00:00:02.000000Z")
            .unwrap();

        // never read: everything from the other side counts
        assert_eq!(db.unread_count("r1", "u2", None).unwrap(), 1);
        // own messages never count
        assert_eq!(db.unread_count("r1", "u1", None).unwrap(), 1);

        assert!(db
            .set_last_read("r1", "u2", "2026-01-01T00:00:03.000000Z")
            .unwrap());
        let last_read = db
            .room_memberships("u2")
            .unwrap()
            .into_iter()
            .find(|p| p.room_id == "r1")
            .and_then(|p| p.last_read_at)
            .unwrap();
        assert_eq!(db.unread_count("r1", "u2", Some(&last_read)).unwrap(), 0);
    }

    #[test]
    fn test_rooms_other_participants_batch() {
        let db = db();
        db.create_dm_room("r1", "u1:u2", "u1", "u2", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        db.create_dm_room("r2", "u1:u3", "u1", "u3", "2026-01-01T00:00:00.000000Z")
            .unwrap();

        let others = db
            .rooms_other_participants(&["r1".into(), "r2".into()], "u1")
            .unwrap();
        assert_eq!(others.len(), 2);
        assert!(others.iter().any(|p| p.room_id == "r1" && p.user_id == "u2"));
        assert!(others.iter().any(|p| p.room_id == "r2" && p.user_id == "u3"));

        assert!(db.rooms_other_participants(&[], "u1").unwrap().is_empty());
    }

    #[test]
    fn test_my_rooms_aggregate_ordering() {
        let db = db();
        db.create_dm_room("r1", "u1:u2", "u1", "u2", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        db.create_dm_room("r2", "u1:u3", "u1", "u3", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        // only r2 has traffic; r1 (message-less) sorts last
        db.insert_chat_message("m1", "r2", "u3", "hey", "2026-01-01T00:00:05.000000Z")
            .unwrap();

        let rows = db.my_rooms_aggregate("u1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].room_id, "r2");
        assert_eq!(rows[0].other_id.as_deref(), Some("u3"));
        assert_eq!(rows[0].last_content.as_deref(), Some("hey"));
        assert_eq!(rows[0].unread_count, 1);
        assert_eq!(rows[1].room_id, "r1");
        assert_eq!(rows[1].last_at, None);
        assert_eq!(rows[1].unread_count, 0);
    }
}
