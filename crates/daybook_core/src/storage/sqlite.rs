//! SQLite-backed namespace storage.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for the key-value namespace.
//! - Apply schema migrations before returning a usable backend.
//!
//! # Invariants
//! - Returned backends have migrations fully applied.
//! - A database with a newer `user_version` than this binary supports is
//!   rejected instead of being written to.

use super::migrations::apply_migrations;
use super::{StorageBackend, StorageResult};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Instant;

/// Durable backend over a single `kv_entries` table.
pub struct SqliteBackend {
    conn: Connection,
}

/// Opens a namespace database file and applies pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_backend(path: impl AsRef<Path>) -> StorageResult<SqliteBackend> {
    let started_at = Instant::now();
    info!("event=db_open module=storage status=start mode=file");

    let result = Connection::open(path)
        .map_err(Into::into)
        .and_then(bootstrap_connection);

    match result {
        Ok(backend) => {
            info!(
                "event=db_open module=storage status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(backend)
        }
        Err(err) => {
            error!(
                "event=db_open module=storage status=error mode=file duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an in-memory namespace database and applies pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_backend_in_memory() -> StorageResult<SqliteBackend> {
    let started_at = Instant::now();
    info!("event=db_open module=storage status=start mode=memory");

    let result = Connection::open_in_memory()
        .map_err(Into::into)
        .and_then(bootstrap_connection);

    match result {
        Ok(backend) => {
            info!(
                "event=db_open module=storage status=ok mode=memory duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(backend)
        }
        Err(err) => {
            error!(
                "event=db_open module=storage status=error mode=memory duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(mut conn: Connection) -> StorageResult<SqliteBackend> {
    apply_migrations(&mut conn)?;
    Ok(SqliteBackend { conn })
}

impl StorageBackend for SqliteBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();

        while let Some(row) = rows.next()? {
            keys.push(row.get::<_, String>(0)?);
        }

        Ok(keys)
    }
}
