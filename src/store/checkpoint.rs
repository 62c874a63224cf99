//! Run progress stored next to the imported rows
//!
//! Each committed page also records the URL of the page after it, in the
//! same transaction, so an interrupted run can pick up where it stopped.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

const CREATE_CHECKPOINTS: &str = "
CREATE TABLE IF NOT EXISTS ingest_checkpoints (
    target TEXT PRIMARY KEY,
    next_url TEXT,
    pages INTEGER NOT NULL,
    completed INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Progress of the latest run into one target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub target: String,
    /// Next page to fetch; `None` once the final page is committed
    pub next_url: Option<String>,
    pub pages: u64,
    pub completed: bool,
}

pub(crate) fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_CHECKPOINTS)?;
    Ok(())
}

pub(crate) fn save(conn: &Connection, checkpoint: &Checkpoint) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_checkpoints (target, next_url, pages, completed, updated_at)
         VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
         ON CONFLICT(target) DO UPDATE SET
             next_url = excluded.next_url,
             pages = excluded.pages,
             completed = excluded.completed,
             updated_at = excluded.updated_at",
        params![
            checkpoint.target,
            checkpoint.next_url,
            checkpoint.pages as i64,
            checkpoint.completed,
        ],
    )?;
    Ok(())
}

pub(crate) fn load(conn: &Connection, target: &str) -> Result<Option<Checkpoint>> {
    let checkpoint = conn
        .query_row(
            "SELECT target, next_url, pages, completed FROM ingest_checkpoints WHERE target = ?1",
            params![target],
            |row| {
                Ok(Checkpoint {
                    target: row.get(0)?,
                    next_url: row.get(1)?,
                    pages: row.get::<_, i64>(2)? as u64,
                    completed: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_overwrites_previous_progress() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_table(&conn).unwrap();
        assert_eq!(load(&conn, "class_imports").unwrap(), None);

        let mut checkpoint = Checkpoint {
            target: "class_imports".to_string(),
            next_url: Some("https://example.test/?page=2".to_string()),
            pages: 1,
            completed: false,
        };
        save(&conn, &checkpoint).unwrap();

        checkpoint.next_url = None;
        checkpoint.pages = 2;
        checkpoint.completed = true;
        save(&conn, &checkpoint).unwrap();

        assert_eq!(load(&conn, "class_imports").unwrap(), Some(checkpoint));
    }
}
