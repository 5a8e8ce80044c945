use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                TEXT PRIMARY KEY,
                username          TEXT NOT NULL UNIQUE,
                password          TEXT NOT NULL,
                invitation_token  TEXT NOT NULL UNIQUE,
                push_token        TEXT,
                created_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE duos (
                id          TEXT PRIMARY KEY,
                user1       TEXT NOT NULL REFERENCES users(id),
                user2       TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_duos_user1 ON duos(user1);
            CREATE INDEX idx_duos_user2 ON duos(user2);

            CREATE TABLE rules (
                id                              TEXT PRIMARY KEY,
                user_id                         TEXT NOT NULL REFERENCES users(id),
                app                             TEXT NOT NULL,
                is_active                       INTEGER NOT NULL,
                intervention_type               TEXT NOT NULL,
                daily_reset                     TEXT NOT NULL,
                daily_max_seconds               INTEGER NOT NULL,
                hourly_max_seconds              INTEGER NOT NULL,
                session_max_seconds             INTEGER NOT NULL,
                is_daily_max_seconds_enforced   INTEGER NOT NULL,
                is_hourly_max_seconds_enforced  INTEGER NOT NULL,
                is_session_max_seconds_enforced INTEGER NOT NULL,
                is_startup_delay_enabled        INTEGER NOT NULL,
                created_at                      TEXT NOT NULL DEFAULT (datetime('now')),
                last_modified_at                TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, app)
            );

            CREATE INDEX idx_rules_user ON rules(user_id);

            -- A pending proposal is an owned child of its rule: deleting the
            -- rule cascade-deletes the proposal, so requests can never orphan.
            CREATE TABLE rule_modification_requests (
                id                              TEXT PRIMARY KEY,
                user_id                         TEXT NOT NULL,
                app                             TEXT NOT NULL,
                is_active                       INTEGER NOT NULL,
                intervention_type               TEXT NOT NULL,
                daily_reset                     TEXT NOT NULL,
                daily_max_seconds               INTEGER NOT NULL,
                hourly_max_seconds              INTEGER NOT NULL,
                session_max_seconds             INTEGER NOT NULL,
                is_daily_max_seconds_enforced   INTEGER NOT NULL,
                is_hourly_max_seconds_enforced  INTEGER NOT NULL,
                is_session_max_seconds_enforced INTEGER NOT NULL,
                is_startup_delay_enabled        INTEGER NOT NULL,
                created_at                      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, app),
                FOREIGN KEY (user_id, app) REFERENCES rules(user_id, app) ON DELETE CASCADE
            );

            CREATE TABLE scores (
                id                      TEXT PRIMARY KEY,
                user_id                 TEXT NOT NULL REFERENCES users(id),
                date                    TEXT NOT NULL,
                value                   INTEGER NOT NULL,
                uninterrupted_tracking  INTEGER NOT NULL,
                created_at              TEXT NOT NULL DEFAULT (datetime('now')),
                last_modified_at        TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, date)
            );

            CREATE INDEX idx_scores_user_date ON scores(user_id, date);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
