use crate::Database;
use crate::models::{DuoRow, ModificationRequestRow, RuleRow, ScoreRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;
use tandem_types::models::RuleSettings;

const RULE_COLS: &str = "id, user_id, app, is_active, intervention_type, daily_reset, \
     daily_max_seconds, hourly_max_seconds, session_max_seconds, \
     is_daily_max_seconds_enforced, is_hourly_max_seconds_enforced, is_session_max_seconds_enforced, \
     is_startup_delay_enabled, created_at, last_modified_at";

const REQUEST_COLS: &str = "id, user_id, app, is_active, intervention_type, daily_reset, \
     daily_max_seconds, hourly_max_seconds, session_max_seconds, \
     is_daily_max_seconds_enforced, is_hourly_max_seconds_enforced, is_session_max_seconds_enforced, \
     is_startup_delay_enabled, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        invitation_token: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, invitation_token) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, invitation_token),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_invitation_token(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "invitation_token", token))
    }

    /// Store the caller's device push token. Returns false for an unknown user.
    pub fn set_push_token(&self, user_id: &str, token: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE users SET push_token = ?2 WHERE id = ?1",
                (user_id, token),
            )?;
            Ok(affected > 0)
        })
    }

    // -- Duos --

    /// The confirmed pairing `user_id` belongs to, if any. At most one exists.
    pub fn find_duo_for(&self, user_id: &str) -> Result<Option<DuoRow>> {
        self.with_conn(|conn| query_duo_for(conn, user_id))
    }

    /// Pair two users. Returns false without inserting when either side is
    /// already in a duo; the check and the insert share one lock acquisition.
    pub fn create_duo(&self, id: &str, user1: &str, user2: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            if query_duo_for(conn, user1)?.is_some() || query_duo_for(conn, user2)?.is_some() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO duos (id, user1, user2) VALUES (?1, ?2, ?3)",
                (id, user1, user2),
            )?;
            Ok(true)
        })
    }

    // -- Rules --

    pub fn get_rule(&self, user_id: &str, app: &str) -> Result<Option<RuleRow>> {
        self.with_conn(|conn| query_rule(conn, user_id, app))
    }

    pub fn list_rules_for_pair(&self, user_a: &str, user_b: &str) -> Result<Vec<RuleRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RULE_COLS} FROM rules WHERE user_id IN (?1, ?2) ORDER BY app, user_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((user_a, user_b), map_rule_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert a new rule for (user, app). Returns false when one already
    /// exists; the existence check and the insert share one lock acquisition.
    pub fn create_rule(&self, id: &str, user_id: &str, app: &str, settings: &RuleSettings) -> Result<bool> {
        self.with_conn_mut(|conn| {
            if query_rule(conn, user_id, app)?.is_some() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO rules (id, user_id, app, is_active, intervention_type, daily_reset, \
                 daily_max_seconds, hourly_max_seconds, session_max_seconds, \
                 is_daily_max_seconds_enforced, is_hourly_max_seconds_enforced, is_session_max_seconds_enforced, \
                 is_startup_delay_enabled) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    id,
                    user_id,
                    app,
                    settings.is_active,
                    settings.intervention_type.as_str(),
                    format_reset(settings),
                    settings.daily_max_seconds,
                    settings.hourly_max_seconds,
                    settings.session_max_seconds,
                    settings.is_daily_max_seconds_enforced,
                    settings.is_hourly_max_seconds_enforced,
                    settings.is_session_max_seconds_enforced,
                    settings.is_startup_delay_enabled,
                ],
            )?;
            Ok(true)
        })
    }

    /// Overwrite a rule's mutable fields in place (the direct-update path).
    /// Returns false when no rule exists for (user, app).
    pub fn update_rule_settings(&self, user_id: &str, app: &str, settings: &RuleSettings) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE rules SET is_active = ?3, intervention_type = ?4, daily_reset = ?5, \
                 daily_max_seconds = ?6, hourly_max_seconds = ?7, session_max_seconds = ?8, \
                 is_daily_max_seconds_enforced = ?9, is_hourly_max_seconds_enforced = ?10, \
                 is_session_max_seconds_enforced = ?11, is_startup_delay_enabled = ?12, \
                 last_modified_at = datetime('now') \
                 WHERE user_id = ?1 AND app = ?2",
                rusqlite::params![
                    user_id,
                    app,
                    settings.is_active,
                    settings.intervention_type.as_str(),
                    format_reset(settings),
                    settings.daily_max_seconds,
                    settings.hourly_max_seconds,
                    settings.session_max_seconds,
                    settings.is_daily_max_seconds_enforced,
                    settings.is_hourly_max_seconds_enforced,
                    settings.is_session_max_seconds_enforced,
                    settings.is_startup_delay_enabled,
                ],
            )?;
            Ok(affected > 0)
        })
    }

    /// Delete a rule owned by `user_id`. Any pending modification request for
    /// the same key goes with it (cascade). Returns false when absent.
    pub fn delete_rule(&self, user_id: &str, app: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "DELETE FROM rules WHERE user_id = ?1 AND app = ?2",
                (user_id, app),
            )?;
            Ok(affected > 0)
        })
    }

    // -- Modification requests --

    pub fn get_modification_request(&self, user_id: &str, app: &str) -> Result<Option<ModificationRequestRow>> {
        self.with_conn(|conn| query_modification_request(conn, user_id, app))
    }

    pub fn list_modification_requests_for_pair(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<ModificationRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLS} FROM rule_modification_requests WHERE user_id IN (?1, ?2)"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((user_a, user_b), map_request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record a proposed next state for (user, app). A second proposal for the
    /// same key replaces the first — at most one is ever pending.
    pub fn upsert_modification_request(
        &self,
        id: &str,
        user_id: &str,
        app: &str,
        settings: &RuleSettings,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO rule_modification_requests (id, user_id, app, is_active, intervention_type, daily_reset, \
                 daily_max_seconds, hourly_max_seconds, session_max_seconds, \
                 is_daily_max_seconds_enforced, is_hourly_max_seconds_enforced, is_session_max_seconds_enforced, \
                 is_startup_delay_enabled) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
                 ON CONFLICT(user_id, app) DO UPDATE SET \
                 is_active = excluded.is_active, intervention_type = excluded.intervention_type, \
                 daily_reset = excluded.daily_reset, daily_max_seconds = excluded.daily_max_seconds, \
                 hourly_max_seconds = excluded.hourly_max_seconds, session_max_seconds = excluded.session_max_seconds, \
                 is_daily_max_seconds_enforced = excluded.is_daily_max_seconds_enforced, \
                 is_hourly_max_seconds_enforced = excluded.is_hourly_max_seconds_enforced, \
                 is_session_max_seconds_enforced = excluded.is_session_max_seconds_enforced, \
                 is_startup_delay_enabled = excluded.is_startup_delay_enabled, \
                 created_at = datetime('now')",
                rusqlite::params![
                    id,
                    user_id,
                    app,
                    settings.is_active,
                    settings.intervention_type.as_str(),
                    format_reset(settings),
                    settings.daily_max_seconds,
                    settings.hourly_max_seconds,
                    settings.session_max_seconds,
                    settings.is_daily_max_seconds_enforced,
                    settings.is_hourly_max_seconds_enforced,
                    settings.is_session_max_seconds_enforced,
                    settings.is_startup_delay_enabled,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_modification_request(&self, user_id: &str, app: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "DELETE FROM rule_modification_requests WHERE user_id = ?1 AND app = ?2",
                (user_id, app),
            )?;
            Ok(affected > 0)
        })
    }

    /// Approve the pending request for (user, app): copy every mutable field
    /// onto the rule, delete the request, and return the updated rule. The
    /// read, the copy, and the delete run inside one transaction under one
    /// lock acquisition, so a concurrent rule delete cannot interleave.
    /// Returns None when no request (or no rule) exists.
    pub fn apply_modification_request(&self, user_id: &str, app: &str) -> Result<Option<RuleRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let Some(request) = query_modification_request(&tx, user_id, app)? else {
                return Ok(None);
            };

            let affected = tx.execute(
                "UPDATE rules SET is_active = ?3, intervention_type = ?4, daily_reset = ?5, \
                 daily_max_seconds = ?6, hourly_max_seconds = ?7, session_max_seconds = ?8, \
                 is_daily_max_seconds_enforced = ?9, is_hourly_max_seconds_enforced = ?10, \
                 is_session_max_seconds_enforced = ?11, is_startup_delay_enabled = ?12, \
                 last_modified_at = datetime('now') \
                 WHERE user_id = ?1 AND app = ?2",
                rusqlite::params![
                    user_id,
                    app,
                    request.is_active,
                    request.intervention_type,
                    request.daily_reset,
                    request.daily_max_seconds,
                    request.hourly_max_seconds,
                    request.session_max_seconds,
                    request.is_daily_max_seconds_enforced,
                    request.is_hourly_max_seconds_enforced,
                    request.is_session_max_seconds_enforced,
                    request.is_startup_delay_enabled,
                ],
            )?;
            if affected == 0 {
                return Ok(None);
            }

            tx.execute(
                "DELETE FROM rule_modification_requests WHERE user_id = ?1 AND app = ?2",
                (user_id, app),
            )?;
            tx.commit()?;

            query_rule(conn, user_id, app)
        })
    }

    // -- Scores --

    /// One score per (user, date): posting the same date again overwrites the
    /// stored value in place.
    pub fn upsert_score(
        &self,
        id: &str,
        user_id: &str,
        date: &str,
        value: i64,
        uninterrupted_tracking: bool,
    ) -> Result<ScoreRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO scores (id, user_id, date, value, uninterrupted_tracking) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(user_id, date) DO UPDATE SET \
                 value = excluded.value, uninterrupted_tracking = excluded.uninterrupted_tracking, \
                 last_modified_at = datetime('now')",
                rusqlite::params![id, user_id, date, value, uninterrupted_tracking],
            )?;
            query_score(conn, user_id, date)?
                .ok_or_else(|| anyhow::anyhow!("Score missing after upsert for {} on {}", user_id, date))
        })
    }

    pub fn get_scores_in_range(&self, user_id: &str, start: &str, end: &str) -> Result<Vec<ScoreRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, date, value, uninterrupted_tracking, created_at, last_modified_at \
                 FROM scores WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date",
            )?;
            let rows = stmt
                .query_map((user_id, start, end), map_score_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn format_reset(settings: &RuleSettings) -> String {
    settings.daily_reset.format("%H:%M:%S").to_string()
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of three fixed names, never caller input.
    let sql = format!(
        "SELECT id, username, password, invitation_token, push_token, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                invitation_token: row.get(3)?,
                push_token: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_duo_for(conn: &Connection, user_id: &str) -> Result<Option<DuoRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user1, user2, created_at FROM duos WHERE user1 = ?1 OR user2 = ?1",
    )?;

    let row = stmt
        .query_row([user_id], |row| {
            Ok(DuoRow {
                id: row.get(0)?,
                user1: row.get(1)?,
                user2: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_rule(conn: &Connection, user_id: &str, app: &str) -> Result<Option<RuleRow>> {
    let sql = format!("SELECT {RULE_COLS} FROM rules WHERE user_id = ?1 AND app = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row((user_id, app), map_rule_row).optional()?;
    Ok(row)
}

fn query_modification_request(
    conn: &Connection,
    user_id: &str,
    app: &str,
) -> Result<Option<ModificationRequestRow>> {
    let sql = format!(
        "SELECT {REQUEST_COLS} FROM rule_modification_requests WHERE user_id = ?1 AND app = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row((user_id, app), map_request_row).optional()?;
    Ok(row)
}

fn query_score(conn: &Connection, user_id: &str, date: &str) -> Result<Option<ScoreRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, date, value, uninterrupted_tracking, created_at, last_modified_at \
         FROM scores WHERE user_id = ?1 AND date = ?2",
    )?;
    let row = stmt.query_row((user_id, date), map_score_row).optional()?;
    Ok(row)
}

fn map_rule_row(row: &rusqlite::Row) -> rusqlite::Result<RuleRow> {
    Ok(RuleRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        app: row.get(2)?,
        is_active: row.get(3)?,
        intervention_type: row.get(4)?,
        daily_reset: row.get(5)?,
        daily_max_seconds: row.get(6)?,
        hourly_max_seconds: row.get(7)?,
        session_max_seconds: row.get(8)?,
        is_daily_max_seconds_enforced: row.get(9)?,
        is_hourly_max_seconds_enforced: row.get(10)?,
        is_session_max_seconds_enforced: row.get(11)?,
        is_startup_delay_enabled: row.get(12)?,
        created_at: row.get(13)?,
        last_modified_at: row.get(14)?,
    })
}

fn map_request_row(row: &rusqlite::Row) -> rusqlite::Result<ModificationRequestRow> {
    Ok(ModificationRequestRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        app: row.get(2)?,
        is_active: row.get(3)?,
        intervention_type: row.get(4)?,
        daily_reset: row.get(5)?,
        daily_max_seconds: row.get(6)?,
        hourly_max_seconds: row.get(7)?,
        session_max_seconds: row.get(8)?,
        is_daily_max_seconds_enforced: row.get(9)?,
        is_hourly_max_seconds_enforced: row.get(10)?,
        is_session_max_seconds_enforced: row.get(11)?,
        is_startup_delay_enabled: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn map_score_row(row: &rusqlite::Row) -> rusqlite::Result<ScoreRow> {
    Ok(ScoreRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        value: row.get(3)?,
        uninterrupted_tracking: row.get(4)?,
        created_at: row.get(5)?,
        last_modified_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use tandem_types::models::InterventionType;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().to_string();
        db.create_user(&id, username, "hash", &token).unwrap();
        id
    }

    fn settings() -> RuleSettings {
        RuleSettings {
            is_active: true,
            intervention_type: InterventionType::Full,
            daily_reset: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            daily_max_seconds: 3600,
            hourly_max_seconds: 600,
            session_max_seconds: 300,
            is_daily_max_seconds_enforced: true,
            is_hourly_max_seconds_enforced: true,
            is_session_max_seconds_enforced: true,
            is_startup_delay_enabled: true,
        }
    }

    fn request_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM rule_modification_requests", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn create_rule_rejects_duplicate() {
        let db = test_db();
        let alice = add_user(&db, "alice");

        let created = db
            .create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();
        assert!(created);

        let again = db
            .create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();
        assert!(!again);
    }

    #[test]
    fn modification_request_requires_a_rule() {
        let db = test_db();
        let alice = add_user(&db, "alice");

        let result = db.upsert_modification_request(
            &Uuid::new_v4().to_string(),
            &alice,
            "com.example.app",
            &settings(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn second_proposal_replaces_the_first() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        db.create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();

        let mut first = settings();
        first.daily_max_seconds = 7200;
        db.upsert_modification_request(&Uuid::new_v4().to_string(), &alice, "com.example.app", &first)
            .unwrap();

        let mut second = settings();
        second.daily_max_seconds = 5400;
        db.upsert_modification_request(&Uuid::new_v4().to_string(), &alice, "com.example.app", &second)
            .unwrap();

        assert_eq!(request_count(&db), 1);
        let pending = db
            .get_modification_request(&alice, "com.example.app")
            .unwrap()
            .unwrap();
        assert_eq!(pending.daily_max_seconds, 5400);
    }

    #[test]
    fn delete_rule_cascades_pending_request() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        db.create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();
        db.upsert_modification_request(
            &Uuid::new_v4().to_string(),
            &alice,
            "com.example.app",
            &settings(),
        )
        .unwrap();

        assert!(db.delete_rule(&alice, "com.example.app").unwrap());
        assert!(db.get_modification_request(&alice, "com.example.app").unwrap().is_none());
        assert_eq!(request_count(&db), 0);
    }

    #[test]
    fn apply_copies_every_field_and_consumes_the_request() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        db.create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();

        let proposed = RuleSettings {
            is_active: false,
            intervention_type: InterventionType::Partial,
            daily_reset: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
            daily_max_seconds: 7200,
            hourly_max_seconds: 1200,
            session_max_seconds: 900,
            is_daily_max_seconds_enforced: false,
            is_hourly_max_seconds_enforced: false,
            is_session_max_seconds_enforced: false,
            is_startup_delay_enabled: false,
        };
        db.upsert_modification_request(&Uuid::new_v4().to_string(), &alice, "com.example.app", &proposed)
            .unwrap();

        let rule = db
            .apply_modification_request(&alice, "com.example.app")
            .unwrap()
            .unwrap();

        assert!(!rule.is_active);
        assert_eq!(rule.intervention_type, "PARTIAL");
        assert_eq!(rule.daily_reset, "06:30:00");
        assert_eq!(rule.daily_max_seconds, 7200);
        assert_eq!(rule.hourly_max_seconds, 1200);
        assert_eq!(rule.session_max_seconds, 900);
        assert!(!rule.is_daily_max_seconds_enforced);
        assert!(!rule.is_hourly_max_seconds_enforced);
        assert!(!rule.is_session_max_seconds_enforced);
        assert!(!rule.is_startup_delay_enabled);

        assert!(db.get_modification_request(&alice, "com.example.app").unwrap().is_none());
    }

    #[test]
    fn apply_without_pending_request_is_a_no_op() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        db.create_rule(&Uuid::new_v4().to_string(), &alice, "com.example.app", &settings())
            .unwrap();

        assert!(db.apply_modification_request(&alice, "com.example.app").unwrap().is_none());
    }

    #[test]
    fn duo_pairing_is_exclusive() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let carol = add_user(&db, "carol");

        assert!(db.create_duo(&Uuid::new_v4().to_string(), &alice, &bob).unwrap());
        // Bob is taken — carol cannot pair with him.
        assert!(!db.create_duo(&Uuid::new_v4().to_string(), &carol, &bob).unwrap());

        let duo = db.find_duo_for(&bob).unwrap().unwrap();
        assert_eq!(duo.partner_of(&bob), alice);
    }

    #[test]
    fn score_upsert_is_idempotent() {
        let db = test_db();
        let alice = add_user(&db, "alice");

        db.upsert_score(&Uuid::new_v4().to_string(), &alice, "2025-03-01", 80, true)
            .unwrap();
        let updated = db
            .upsert_score(&Uuid::new_v4().to_string(), &alice, "2025-03-01", 65, false)
            .unwrap();

        assert_eq!(updated.value, 65);
        assert!(!updated.uninterrupted_tracking);

        let rows = db.get_scores_in_range(&alice, "2025-03-01", "2025-03-01").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 65);
    }

    #[test]
    fn score_range_is_inclusive_and_scoped_to_the_user() {
        let db = test_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");

        for (date, value) in [("2025-03-01", 10), ("2025-03-02", 20), ("2025-03-03", 30)] {
            db.upsert_score(&Uuid::new_v4().to_string(), &alice, date, value, true)
                .unwrap();
        }
        db.upsert_score(&Uuid::new_v4().to_string(), &bob, "2025-03-02", 99, true)
            .unwrap();

        let rows = db.get_scores_in_range(&alice, "2025-03-01", "2025-03-02").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, 10);
        assert_eq!(rows[1].value, 20);
    }
}
