use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::error::{Result, StickydocError};

use super::note::{Geometry, Note};

const NOTES_DB: &str = "notes.db";

/// Durable mirror of the note collection. Every store mutation writes
/// through here before returning, so a process restart restores exact
/// prior state including dirty flags.
pub struct Db {
    conn: Connection,
    #[allow(dead_code)]
    path: PathBuf,
}

impl Db {
    /// Open or create the notes database inside the data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(NOTES_DB);
        let conn = Connection::open(&path)?;

        let db = Self { conn, path };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                width REAL NOT NULL,
                height REAL NOT NULL,
                is_dirty INTEGER NOT NULL,
                is_minimized INTEGER NOT NULL,
                is_pinned INTEGER NOT NULL,
                color TEXT NOT NULL,
                named_range_id TEXT,
                source_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn upsert(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notes (
                id, title, content, x, y, width, height,
                is_dirty, is_minimized, is_pinned, color,
                named_range_id, source_url, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.geometry.x,
                note.geometry.y,
                note.geometry.width,
                note.geometry.height,
                note.is_dirty,
                note.is_minimized,
                note.is_pinned,
                note.color.to_string(),
                note.named_range_id,
                note.source_url,
                note.created_at.to_rfc3339(),
                note.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: &Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn load_all(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, x, y, width, height,
                    is_dirty, is_minimized, is_pinned, color,
                    named_range_id, source_url, created_at, updated_at
             FROM notes",
        )?;

        let rows = stmt.query_map([], row_to_note)?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(row??);
        }
        Ok(notes)
    }

    /// Write the whole collection in one transaction.
    pub fn persist_all<'a>(&mut self, notes: impl Iterator<Item = &'a Note>) -> Result<()> {
        let tx = self.conn.transaction()?;
        for note in notes {
            tx.execute(
                "INSERT OR REPLACE INTO notes (
                    id, title, content, x, y, width, height,
                    is_dirty, is_minimized, is_pinned, color,
                    named_range_id, source_url, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    note.id.to_string(),
                    note.title,
                    note.content,
                    note.geometry.x,
                    note.geometry.y,
                    note.geometry.width,
                    note.geometry.height,
                    note.is_dirty,
                    note.is_minimized,
                    note.is_pinned,
                    note.color.to_string(),
                    note.named_range_id,
                    note.source_url,
                    note.created_at.to_rfc3339(),
                    note.updated_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn row_to_note(row: &Row<'_>) -> std::result::Result<Result<Note>, rusqlite::Error> {
    let id: String = row.get(0)?;
    let color: String = row.get(10)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(build_note(row, id, color, created_at, updated_at))
}

fn build_note(
    row: &Row<'_>,
    id: String,
    color: String,
    created_at: String,
    updated_at: String,
) -> Result<Note> {
    Ok(Note {
        id: Uuid::parse_str(&id)
            .map_err(|e| StickydocError::Storage(format!("bad note id '{}': {}", id, e)))?,
        title: row.get(1)?,
        content: row.get(2)?,
        geometry: Geometry {
            x: row.get(3)?,
            y: row.get(4)?,
            width: row.get(5)?,
            height: row.get(6)?,
        },
        is_dirty: row.get(7)?,
        is_minimized: row.get(8)?,
        is_pinned: row.get(9)?,
        color: color.parse().unwrap_or_default(),
        named_range_id: row.get(11)?,
        source_url: row.get(12)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StickydocError::Storage(format!("bad timestamp '{}': {}", raw, e)))
}
