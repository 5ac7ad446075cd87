//! SQLite users store backing the SQL tool.
//!
//! Uses `rusqlite` in synchronous mode. The SQL tool moves each statement
//! onto a blocking thread and holds the connection mutex for its duration,
//! which serializes writes across concurrent requests.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use super::errors::ToolError;

/// Users inserted by [`UsersDatabase::seed_sample_users`].
pub const SAMPLE_USERS: [(&str, &str); 5] = [
    ("Alice Johnson", "alice@example.com"),
    ("Bob Smith", "bob@example.com"),
    ("Carol Davis", "carol@example.com"),
    ("David Wilson", "david@example.com"),
    ("Eva Brown", "eva@example.com"),
];

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

// ─── UsersDatabase ───────────────────────────────────────────────────────────

/// SQLite handle for the users store.
pub struct UsersDatabase {
    conn: Connection,
}

impl UsersDatabase {
    /// Open (or create) the database at the given path, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, ToolError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ToolError::ConfigError {
                reason: format!("failed to create {}: {e}", parent.display()),
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.create_tables()?;
        tracing::info!(path = %path.display(), "opened users database");
        Ok(db)
    }

    /// In-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, ToolError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<(), ToolError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )?;
        Ok(())
    }

    /// Insert the sample users. Existing emails are left untouched, so this
    /// is safe to run on every startup. Returns the number of rows inserted.
    pub fn seed_sample_users(&self) -> Result<usize, ToolError> {
        let mut stmt = self
            .conn
            .prepare("INSERT OR IGNORE INTO users (name, email) VALUES (?1, ?2)")?;

        let mut inserted = 0;
        for (name, email) in SAMPLE_USERS {
            inserted += stmt.execute(params![name, email])?;
        }

        tracing::info!(inserted, "seeded sample users");
        Ok(inserted)
    }

    /// All users ordered by id.
    pub fn list_users(&self) -> Result<Vec<UserRow>, ToolError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, created_at FROM users ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Hand the connection over to the SQL tool.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
