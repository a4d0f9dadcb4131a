use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            phone_number    TEXT,
            address         TEXT,
            gender          TEXT,
            birth_year      INTEGER,
            is_manager      INTEGER NOT NULL DEFAULT 0,
            is_provider     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stores (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL UNIQUE REFERENCES profiles(id),
            name            TEXT NOT NULL,
            description     TEXT,
            phone           TEXT,
            address         TEXT,
            logo_url        TEXT,
            cover_url       TEXT,
            categories      TEXT NOT NULL DEFAULT '[]',
            service_areas   TEXT NOT NULL DEFAULT '[]',
            is_published    INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS portfolios (
            id              TEXT PRIMARY KEY,
            store_id        TEXT NOT NULL REFERENCES stores(id),
            project_title   TEXT NOT NULL,
            kind            TEXT,
            area            INTEGER,
            location        TEXT,
            style           TEXT,
            duration        INTEGER,
            personnel       INTEGER,
            tags            TEXT NOT NULL DEFAULT '[]',
            content         TEXT NOT NULL DEFAULT '',
            cover_url       TEXT,
            published       INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_portfolios_store
            ON portfolios(store_id, created_at);

        CREATE TABLE IF NOT EXISTS provider_applications (
            id              TEXT PRIMARY KEY,
            applicant_id    TEXT NOT NULL REFERENCES profiles(id),
            business_reg    TEXT NOT NULL,
            portfolio_url   TEXT,
            memo            TEXT,
            status          INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_applications_status
            ON provider_applications(status, created_at);

        -- pair_key is the sorted 'min_id:max_id' of the two participants of
        -- a dm room; the UNIQUE constraint is what makes concurrent
        -- get-or-create calls for the same pair collapse to one room.
        CREATE TABLE IF NOT EXISTS chat_rooms (
            id          TEXT PRIMARY KEY,
            room_type   TEXT NOT NULL DEFAULT 'dm',
            pair_key    TEXT UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_room_participants (
            room_id         TEXT NOT NULL REFERENCES chat_rooms(id),
            user_id         TEXT NOT NULL REFERENCES profiles(id),
            joined_at       TEXT NOT NULL,
            last_read_at    TEXT,
            PRIMARY KEY (room_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_participants_user
            ON chat_room_participants(user_id);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            room_id     TEXT NOT NULL REFERENCES chat_rooms(id),
            sender_id   TEXT NOT NULL REFERENCES profiles(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON chat_messages(room_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            kind        TEXT NOT NULL,
            body        TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, is_read);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
