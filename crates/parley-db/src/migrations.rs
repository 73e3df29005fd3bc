//! Embedded SQL migration runner.
//!
//! Migrations are SQL files embedded at compile time. They run sequentially
//! on startup, tracked by the `_parley_migrations` table. Each migration
//! runs exactly once — if it has already been applied, it is skipped.

use rusqlite::Connection;
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_users",
        sql: include_str!("migrations/000_users.sql"),
    },
    Migration {
        name: "001_roles",
        sql: include_str!("migrations/001_roles.sql"),
    },
    Migration {
        name: "002_chats",
        sql: include_str!("migrations/002_chats.sql"),
    },
    Migration {
        name: "003_messages",
        sql: include_str!("migrations/003_messages.sql"),
    },
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Runs all pending migrations against the given connection.
///
/// Migrations that have already been applied (tracked in `_parley_migrations`)
/// are skipped. New migrations are applied in order and recorded.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// migration tracking table cannot be queried.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    // Ensure the tracking table exists before checking what's been applied.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _parley_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| MigrationError::ExecutionFailed {
        name: "_parley_migrations_bootstrap".to_string(),
        source: e,
    })?;

    let mut applied = 0;

    for migration in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _parley_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(
                migration = migration.name,
                "migration already applied, skipping"
            );
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| MigrationError::ExecutionFailed {
                name: migration.name.to_string(),
                source: e,
            })?;

        tx.execute_batch(migration.sql)
            .map_err(|e| MigrationError::ExecutionFailed {
                name: migration.name.to_string(),
                source: e,
            })?;

        tx.execute(
            "INSERT INTO _parley_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(|e| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source: e,
        })?;

        tx.commit().map_err(|e| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source: e,
        })?;

        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn run_migrations_on_fresh_db() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 4, "should apply all migrations");

        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM _parley_migrations", [], |row| {
                row.get(0)
            })
            .expect("should query migration count");
        assert_eq!(count, 4);
    }

    #[test]
    fn run_migrations_idempotent() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");

        let first = run_migrations(&conn).expect("first run should succeed");
        assert_eq!(first, 4);

        let second = run_migrations(&conn).expect("second run should succeed");
        assert_eq!(second, 0, "no new migrations to apply");
    }

    #[test]
    fn verify_role_seeds() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        let role_count: i32 = conn
            .query_row("SELECT COUNT(*) FROM roles", [], |row| row.get(0))
            .expect("should query roles count");
        assert_eq!(role_count, 2);

        let active: bool = conn
            .query_row(
                "SELECT is_active FROM roles WHERE name = 'Spider-Man'",
                [],
                |row| row.get(0),
            )
            .expect("should query Spider-Man role");
        assert!(active, "seeded roles should be active");
    }

    #[test]
    fn messages_cascade_with_chat_delete() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .expect("should enable foreign keys");
        run_migrations(&conn).expect("migrations should succeed");

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES ('u1', 'alice', 'a@example.com', 'x')",
            [],
        )
        .expect("should seed user");
        let role_id: String = conn
            .query_row("SELECT id FROM roles LIMIT 1", [], |row| row.get(0))
            .expect("should read seeded role");
        conn.execute(
            "INSERT INTO chats (id, user_id, role_id, title) VALUES ('c1', 'u1', ?1, 'T')",
            [&role_id],
        )
        .expect("should seed chat");
        conn.execute(
            "INSERT INTO messages (id, chat_id, sender, content, order_in_chat) VALUES ('m1', 'c1', 'user', 'hi', 0)",
            [],
        )
        .expect("should seed message");

        conn.execute("DELETE FROM chats WHERE id = 'c1'", [])
            .expect("should delete chat");

        let orphans: i32 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("should count messages");
        assert_eq!(orphans, 0, "cascade delete should remove chat messages");
    }

    #[test]
    fn duplicate_order_in_chat_is_rejected() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES ('u1', 'alice', 'a@example.com', 'x')",
            [],
        )
        .expect("should seed user");
        let role_id: String = conn
            .query_row("SELECT id FROM roles LIMIT 1", [], |row| row.get(0))
            .expect("should read seeded role");
        conn.execute(
            "INSERT INTO chats (id, user_id, role_id, title) VALUES ('c1', 'u1', ?1, 'T')",
            [&role_id],
        )
        .expect("should seed chat");
        conn.execute(
            "INSERT INTO messages (id, chat_id, sender, content, order_in_chat) VALUES ('m1', 'c1', 'user', 'hi', 0)",
            [],
        )
        .expect("first insert at order 0 should succeed");

        let err = conn.execute(
            "INSERT INTO messages (id, chat_id, sender, content, order_in_chat) VALUES ('m2', 'c1', 'user', 'again', 0)",
            [],
        );
        assert!(err.is_err(), "duplicate (chat_id, order_in_chat) must fail");
    }
}
