use crate::models::{ApplicationRow, NotificationRow, PortfolioRow, ProfileRow, StoreRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Profiles --

    pub fn create_profile(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id, username, password_hash, now],
            )?;
            Ok(())
        })
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            query_profile(conn, "SELECT * FROM profiles WHERE username = ?1", username)
        })
    }

    pub fn get_profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "SELECT * FROM profiles WHERE id = ?1", id))
    }

    /// Partial profile update: None leaves the stored value untouched.
    pub fn update_profile(
        &self,
        id: &str,
        gender: Option<&str>,
        address: Option<&str>,
        birth_year: Option<i64>,
        phone_number: Option<&str>,
        now: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET
                    gender       = COALESCE(?2, gender),
                    address      = COALESCE(?3, address),
                    birth_year   = COALESCE(?4, birth_year),
                    phone_number = COALESCE(?5, phone_number),
                    updated_at   = ?6
                 WHERE id = ?1",
                rusqlite::params![id, gender, address, birth_year, phone_number, now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_provider_status(&self, id: &str, status: i64, now: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE profiles SET is_provider = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, status, now],
            )?;
            Ok(())
        })
    }

    pub fn is_manager(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let row: Option<bool> = conn
                .query_row(
                    "SELECT is_manager FROM profiles WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row.unwrap_or(false))
        })
    }

    // -- Stores --

    /// One store per owner: insert or overwrite the owner's existing store.
    /// Returns the store id.
    pub fn upsert_store(
        &self,
        id: &str,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
        logo_url: Option<&str>,
        cover_url: Option<&str>,
        categories: &[String],
        service_areas: &[String],
        is_published: bool,
        now: &str,
    ) -> Result<String> {
        let categories = serde_json::to_string(categories)?;
        let service_areas = serde_json::to_string(service_areas)?;
        self.with_conn(|conn| {
            let store_id: String = conn.query_row(
                "INSERT INTO stores
                    (id, owner_id, name, description, phone, address, logo_url,
                     cover_url, categories, service_areas, is_published,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                 ON CONFLICT(owner_id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    phone = excluded.phone,
                    address = excluded.address,
                    logo_url = excluded.logo_url,
                    cover_url = excluded.cover_url,
                    categories = excluded.categories,
                    service_areas = excluded.service_areas,
                    is_published = excluded.is_published,
                    updated_at = excluded.updated_at
                 RETURNING id",
                rusqlite::params![
                    id,
                    owner_id,
                    name,
                    description,
                    phone,
                    address,
                    logo_url,
                    cover_url,
                    categories,
                    service_areas,
                    is_published,
                    now
                ],
                |row| row.get(0),
            )?;
            Ok(store_id)
        })
    }

    pub fn get_store(&self, id: &str) -> Result<Option<StoreRow>> {
        self.with_conn(|conn| query_store(conn, "SELECT * FROM stores WHERE id = ?1", id))
    }

    pub fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<StoreRow>> {
        self.with_conn(|conn| {
            query_store(conn, "SELECT * FROM stores WHERE owner_id = ?1", owner_id)
        })
    }

    /// Published stores with optional category containment and name search,
    /// newest first. Returns the page plus the total match count.
    pub fn list_published_stores(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<StoreRow>, i64)> {
        let category = category.map(str::to_string);
        let pattern = search.map(|s| format!("%{}%", s));

        self.with_conn(|conn| {
            let mut clauses = vec!["is_published = 1".to_string()];
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(ref category) = category {
                params.push(category);
                clauses.push(format!(
                    "EXISTS (SELECT 1 FROM json_each(stores.categories) WHERE value = ?{})",
                    params.len()
                ));
            }
            if let Some(ref pattern) = pattern {
                params.push(pattern);
                clauses.push(format!("name LIKE ?{}", params.len()));
            }

            let where_sql = clauses.join(" AND ");

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM stores WHERE {}", where_sql),
                params.as_slice(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT * FROM stores WHERE {} ORDER BY updated_at DESC LIMIT ?{} OFFSET ?{}",
                where_sql,
                params.len() + 1,
                params.len() + 2
            );
            params.push(&limit);
            params.push(&offset);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), store_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    // -- Portfolios --

    pub fn insert_portfolio(
        &self,
        id: &str,
        store_id: &str,
        project_title: &str,
        kind: Option<&str>,
        area: Option<i64>,
        location: Option<&str>,
        style: Option<&str>,
        duration: Option<i64>,
        personnel: Option<i64>,
        tags: &[String],
        content: &str,
        cover_url: Option<&str>,
        published: bool,
        now: &str,
    ) -> Result<()> {
        let tags = serde_json::to_string(tags)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO portfolios
                    (id, store_id, project_title, kind, area, location, style,
                     duration, personnel, tags, content, cover_url, published,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                rusqlite::params![
                    id,
                    store_id,
                    project_title,
                    kind,
                    area,
                    location,
                    style,
                    duration,
                    personnel,
                    tags,
                    content,
                    cover_url,
                    published,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_portfolio(&self, id: &str) -> Result<Option<PortfolioRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM portfolios WHERE id = ?1")?;
            let row = stmt.query_row([id], portfolio_from_row).optional()?;
            Ok(row)
        })
    }

    /// Partial portfolio update: None leaves the stored value untouched.
    pub fn update_portfolio(
        &self,
        id: &str,
        project_title: Option<&str>,
        kind: Option<&str>,
        area: Option<i64>,
        location: Option<&str>,
        style: Option<&str>,
        duration: Option<i64>,
        personnel: Option<i64>,
        tags: Option<&[String]>,
        content: Option<&str>,
        cover_url: Option<&str>,
        published: Option<bool>,
        now: &str,
    ) -> Result<bool> {
        let tags = tags.map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE portfolios SET
                    project_title = COALESCE(?2, project_title),
                    kind          = COALESCE(?3, kind),
                    area          = COALESCE(?4, area),
                    location      = COALESCE(?5, location),
                    style         = COALESCE(?6, style),
                    duration      = COALESCE(?7, duration),
                    personnel     = COALESCE(?8, personnel),
                    tags          = COALESCE(?9, tags),
                    content       = COALESCE(?10, content),
                    cover_url     = COALESCE(?11, cover_url),
                    published     = COALESCE(?12, published),
                    updated_at    = ?13
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    project_title,
                    kind,
                    area,
                    location,
                    style,
                    duration,
                    personnel,
                    tags,
                    content,
                    cover_url,
                    published,
                    now
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_portfolio(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM portfolios WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Published portfolios, newest first, optionally limited to one store.
    pub fn list_published_portfolios(&self, store_id: Option<&str>) -> Result<Vec<PortfolioRow>> {
        self.with_conn(|conn| {
            let (sql, params) = match store_id {
                Some(store_id) => (
                    "SELECT * FROM portfolios WHERE published = 1 AND store_id = ?1
                     ORDER BY created_at DESC",
                    vec![store_id],
                ),
                None => (
                    "SELECT * FROM portfolios WHERE published = 1 ORDER BY created_at DESC",
                    vec![],
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), portfolio_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner of the store a portfolio belongs to.
    pub fn portfolio_store_owner(&self, portfolio_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT s.owner_id FROM portfolios p
                     JOIN stores s ON p.store_id = s.id
                     WHERE p.id = ?1",
                    [portfolio_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(owner)
        })
    }

    // -- Provider applications --

    pub fn insert_application(
        &self,
        id: &str,
        applicant_id: &str,
        business_reg: &str,
        portfolio_url: Option<&str>,
        memo: Option<&str>,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO provider_applications
                    (id, applicant_id, business_reg, portfolio_url, memo, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![id, applicant_id, business_reg, portfolio_url, memo, now],
            )?;
            Ok(())
        })
    }

    pub fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM provider_applications WHERE id = ?1")?;
            let row = stmt.query_row([id], application_from_row).optional()?;
            Ok(row)
        })
    }

    /// Pending applications, oldest first, with memo substring search and the
    /// total match count for pagination.
    pub fn list_pending_applications(
        &self,
        search: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ApplicationRow>, i64)> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", search.unwrap_or(""));

            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM provider_applications
                 WHERE status = 0 AND COALESCE(memo, '') LIKE ?1",
                [&pattern],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT * FROM provider_applications
                 WHERE status = 0 AND COALESCE(memo, '') LIKE ?1
                 ORDER BY created_at ASC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![pattern, limit, offset],
                    application_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    pub fn set_application_status(&self, id: &str, status: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE provider_applications SET status = ?2 WHERE id = ?1",
                rusqlite::params![id, status],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        kind: &str,
        body: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, body, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![id, user_id, kind, body, now],
            )?;
            Ok(())
        })
    }

    /// Caller's notifications, newest first.
    pub fn list_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn mark_notifications_read(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(())
        })
    }
}

fn query_profile(conn: &Connection, sql: &str, param: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([param], profile_from_row).optional()?;
    Ok(row)
}

fn query_store(conn: &Connection, sql: &str, param: &str) -> Result<Option<StoreRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([param], store_from_row).optional()?;
    Ok(row)
}

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get("id")?,
        username: row.get("username")?,
        password: row.get("password")?,
        phone_number: row.get("phone_number")?,
        address: row.get("address")?,
        gender: row.get("gender")?,
        birth_year: row.get("birth_year")?,
        is_manager: row.get("is_manager")?,
        is_provider: row.get("is_provider")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn store_from_row(row: &rusqlite::Row) -> rusqlite::Result<StoreRow> {
    Ok(StoreRow {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        logo_url: row.get("logo_url")?,
        cover_url: row.get("cover_url")?,
        categories: row.get("categories")?,
        service_areas: row.get("service_areas")?,
        is_published: row.get("is_published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn portfolio_from_row(row: &rusqlite::Row) -> rusqlite::Result<PortfolioRow> {
    Ok(PortfolioRow {
        id: row.get("id")?,
        store_id: row.get("store_id")?,
        project_title: row.get("project_title")?,
        kind: row.get("kind")?,
        area: row.get("area")?,
        location: row.get("location")?,
        style: row.get("style")?,
        duration: row.get("duration")?,
        personnel: row.get("personnel")?,
        tags: row.get("tags")?,
        content: row.get("content")?,
        cover_url: row.get("cover_url")?,
        published: row.get("published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn application_from_row(row: &rusqlite::Row) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get("id")?,
        applicant_id: row.get("applicant_id")?,
        business_reg: row.get("business_reg")?,
        portfolio_url: row.get("portfolio_url")?,
        memo: row.get("memo")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
    })
}

fn notification_from_row(row: &rusqlite::Row) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind: row.get("kind")?,
        body: row.get("body")?,
        is_read: row.get("is_read")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, id: &str, name: &str) {
        db.create_profile(id, name, "hash", "2026-01-01T00:00:00.000000Z")
            .unwrap();
    }

    #[test]
    fn test_profile_round_trip() {
        let db = db();
        seed_user(&db, "u1", "alice");

        let row = db.get_profile_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, "u1");
        assert!(!row.is_manager);
        assert_eq!(row.is_provider, 0);

        assert!(db
            .update_profile("u1", Some("f"), None, Some(1990), None, "2026-01-02T00:00:00.000000Z")
            .unwrap());
        let row = db.get_profile_by_id("u1").unwrap().unwrap();
        assert_eq!(row.gender.as_deref(), Some("f"));
        assert_eq!(row.birth_year, Some(1990));
        // untouched fields survive a partial update
        assert_eq!(row.username, "alice");
    }

    #[test]
    fn test_store_upsert_is_keyed_on_owner() {
        let db = db();
        seed_user(&db, "u1", "alice");

        let first = db
            .upsert_store(
                "s1", "u1", "Alice Interiors", None, None, None, None, None,
                &["tile".into()], &[], true, "2026-01-01T00:00:00.000000Z",
            )
            .unwrap();
        let second = db
            .upsert_store(
                "s2", "u1", "Alice Renovations", Some("new"), None, None, None, None,
                &["paint".into()], &[], true, "2026-01-02T00:00:00.000000Z",
            )
            .unwrap();

        // same owner keeps the original row id
        assert_eq!(first, second);
        let row = db.get_store_by_owner("u1").unwrap().unwrap();
        assert_eq!(row.name, "Alice Renovations");
        assert_eq!(row.categories, "[\"paint\"]");
    }

    #[test]
    fn test_store_listing_filters() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        db.upsert_store(
            "s1", "u1", "Alice Interiors", None, None, None, None, None,
            &["tile".into(), "paint".into()], &[], true, "2026-01-01T00:00:00.000000Z",
        )
        .unwrap();
        db.upsert_store(
            "s2", "u2", "Bob Floors", None, None, None, None, None,
            &["floor".into()], &[], false, "2026-01-02T00:00:00.000000Z",
        )
        .unwrap();

        // unpublished stores never appear
        let (rows, total) = db.list_published_stores(None, None, 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, "s1");

        let (rows, _) = db.list_published_stores(Some("tile"), None, 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
        let (rows, _) = db.list_published_stores(Some("floor"), None, 10, 0).unwrap();
        assert!(rows.is_empty());

        let (rows, _) = db.list_published_stores(None, Some("Interiors"), 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_portfolio_owner_lookup_and_partial_update() {
        let db = db();
        seed_user(&db, "u1", "alice");
        db.upsert_store(
            "s1", "u1", "Alice Interiors", None, None, None, None, None, &[], &[],
            true, "2026-01-01T00:00:00.000000Z",
        )
        .unwrap();
        db.insert_portfolio(
            "p1", "s1", "Kitchen remodel", Some("kitchen"), Some(24), None, None,
            Some(14), Some(3), &["modern".into()], "before/after", None, true,
            "2026-01-02T00:00:00.000000Z",
        )
        .unwrap();

        assert_eq!(
            db.portfolio_store_owner("p1").unwrap().as_deref(),
            Some("u1")
        );
        assert_eq!(db.portfolio_store_owner("missing").unwrap(), None);

        assert!(db
            .update_portfolio(
                "p1", Some("Kitchen remodel v2"), None, None, None, None, None,
                None, None, None, None, Some(false), "2026-01-03T00:00:00.000000Z",
            )
            .unwrap());
        let row = db.get_portfolio("p1").unwrap().unwrap();
        assert_eq!(row.project_title, "Kitchen remodel v2");
        assert!(!row.published);
        assert_eq!(row.kind.as_deref(), Some("kitchen"));

        assert!(db.list_published_portfolios(Some("s1")).unwrap().is_empty());
        assert!(db.delete_portfolio("p1").unwrap());
        assert!(!db.delete_portfolio("p1").unwrap());
    }

    #[test]
    fn test_application_flow() {
        let db = db();
        seed_user(&db, "u1", "alice");
        db.insert_application(
            "a1", "u1", "http://files/reg.pdf", None, Some("tile specialist"),
            "2026-01-01T00:00:00.000000Z",
        )
        .unwrap();

        let (rows, total) = db.list_pending_applications(None, 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].status, 0);

        let (rows, _) = db.list_pending_applications(Some("tile"), 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
        let (rows, _) = db.list_pending_applications(Some("plumbing"), 10, 0).unwrap();
        assert!(rows.is_empty());

        assert!(db.set_application_status("a1", 1).unwrap());
        let (_, total) = db.list_pending_applications(None, 10, 0).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_notifications() {
        let db = db();
        seed_user(&db, "u1", "alice");
        db.insert_notification("n1", "u1", "application", "approved", "2026-01-01T00:00:00.000000Z")
            .unwrap();
        db.insert_notification("n2", "u1", "application", "rejected", "2026-01-02T00:00:00.000000Z")
            .unwrap();

        assert_eq!(db.unread_notification_count("u1").unwrap(), 2);
        db.mark_notifications_read("u1").unwrap();
        assert_eq!(db.unread_notification_count("u1").unwrap(), 0);
    }
}
