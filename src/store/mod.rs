//! Authoritative note collection.
//!
//! The in-memory map is the single source of truth; every mutation is
//! mirrored to SQLite before control returns, so a restart restores the
//! exact prior state, dirty flags included. That is what lets an
//! interrupted save retry on the next sweep.

mod note;
mod sqlite;

pub use note::{Geometry, Note, NoteColor};
pub use sqlite::Db;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StickydocError};

pub type SharedStore = Arc<tokio::sync::Mutex<NoteStore>>;

pub struct NoteStore {
    notes: HashMap<Uuid, Note>,
    db: Db,
}

impl NoteStore {
    /// Open the store, loading any persisted notes.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db = Db::open(data_dir)?;
        let notes: HashMap<Uuid, Note> =
            db.load_all()?.into_iter().map(|n| (n.id, n)).collect();

        if !notes.is_empty() {
            info!(count = notes.len(), "restored notes from storage");
        }

        Ok(Self { notes, db })
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Create a note with default geometry staggered by creation order.
    pub fn create(&mut self, source_url: Option<String>) -> Result<Note> {
        let note = Note::new(self.notes.len(), source_url);
        self.db.upsert(&note)?;
        self.notes.insert(note.id, note.clone());
        Ok(note)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Note> {
        self.notes.get(id)
    }

    /// All notes, oldest first.
    pub fn list(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.notes.values().cloned().collect();
        notes.sort_by_key(|n| n.created_at);
        notes
    }

    /// Ids of notes awaiting a sync, oldest edit first.
    pub fn dirty_ids(&self) -> Vec<Uuid> {
        let mut dirty: Vec<&Note> = self.notes.values().filter(|n| n.is_dirty).collect();
        dirty.sort_by_key(|n| n.updated_at);
        dirty.iter().map(|n| n.id).collect()
    }

    /// Resolve a full UUID or unique prefix, CLI convenience.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<Uuid> {
        if let Ok(id) = Uuid::parse_str(prefix) {
            return self.notes.contains_key(&id).then_some(id);
        }
        let mut matched = None;
        for id in self.notes.keys() {
            if id.to_string().starts_with(prefix) {
                if matched.is_some() {
                    return None; // ambiguous
                }
                matched = Some(*id);
            }
        }
        matched
    }

    pub fn update_content(&mut self, id: Uuid, title: String, content: String) -> Result<Note> {
        let note = self.note_entry(id)?;
        note.title = title;
        note.content = content;
        note.is_dirty = true;
        note.updated_at = Utc::now();
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(copy)
    }

    pub fn update_geometry(&mut self, id: Uuid, geometry: Geometry) -> Result<()> {
        let note = self.note_entry(id)?;
        note.geometry = geometry;
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(())
    }

    pub fn toggle_minimized(&mut self, id: Uuid) -> Result<bool> {
        let note = self.note_entry(id)?;
        note.is_minimized = !note.is_minimized;
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(copy.is_minimized)
    }

    pub fn toggle_pinned(&mut self, id: Uuid) -> Result<bool> {
        let note = self.note_entry(id)?;
        note.is_pinned = !note.is_pinned;
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(copy.is_pinned)
    }

    pub fn set_color(&mut self, id: Uuid, color: NoteColor) -> Result<()> {
        let note = self.note_entry(id)?;
        note.color = color;
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(())
    }

    pub fn mark_dirty(&mut self, id: Uuid) -> Result<()> {
        let note = self.note_entry(id)?;
        note.is_dirty = true;
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(())
    }

    /// Local delete only: the text already written to the document stays
    /// behind, unanchored.
    pub fn delete(&mut self, id: Uuid) -> Result<Note> {
        let note = self
            .notes
            .remove(&id)
            .ok_or_else(|| StickydocError::NoteNotFound(id.to_string()))?;
        self.db.delete(&id)?;
        Ok(note)
    }

    /// Record the outcome of a successful remote save. The dirty flag is
    /// cleared only if the note still matches the snapshot taken at save
    /// start; an edit that raced the network keeps it dirty while the new
    /// anchor is kept either way. Returns true if the note is now clean.
    pub fn apply_save_result(
        &mut self,
        id: Uuid,
        snapshot_title: &str,
        snapshot_content: &str,
        named_range_id: String,
    ) -> Result<bool> {
        let note = self.note_entry(id)?;
        if note.title == snapshot_title && note.content == snapshot_content {
            note.is_dirty = false;
        }
        note.named_range_id = Some(named_range_id);
        let copy = note.clone();
        self.db.upsert(&copy)?;
        Ok(!copy.is_dirty)
    }

    /// Flush the full collection to storage in one transaction.
    pub fn persist_all(&mut self) -> Result<()> {
        let notes: Vec<&Note> = self.notes.values().collect();
        self.db.persist_all(notes.into_iter())
    }

    fn note_entry(&mut self, id: Uuid) -> Result<&mut Note> {
        self.notes
            .get_mut(&id)
            .ok_or_else(|| StickydocError::NoteNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_restart_restores_state() {
        let tmp = TempDir::new().unwrap();

        let id = {
            let mut store = NoteStore::open(tmp.path()).unwrap();
            let note = store.create(Some("https://example.com".into())).unwrap();
            store
                .update_content(note.id, "Title".into(), "<p>Body</p>".into())
                .unwrap();
            store
                .update_geometry(
                    note.id,
                    Geometry {
                        x: 10.0,
                        y: 20.0,
                        width: 300.0,
                        height: 200.0,
                    },
                )
                .unwrap();
            note.id
        };

        let store = NoteStore::open(tmp.path()).unwrap();
        let note = store.get(&id).expect("note survives restart");
        assert!(note.is_dirty, "dirty flag persists across restart");
        assert_eq!(note.title, "Title");
        assert_eq!(note.geometry.x, 10.0);
        assert_eq!(note.source_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_staggered_geometry() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let first = store.create(None).unwrap();
        let second = store.create(None).unwrap();
        assert_eq!(first.geometry.x, 60.0);
        assert_eq!(second.geometry.x, 80.0);
    }

    #[test]
    fn test_apply_save_result_clears_when_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let note = store.create(None).unwrap();
        store
            .update_content(note.id, "T".into(), "C".into())
            .unwrap();

        let clean = store
            .apply_save_result(note.id, "T", "C", "nr-1".into())
            .unwrap();
        assert!(clean);
        let note = store.get(&note.id).unwrap();
        assert!(!note.is_dirty);
        assert_eq!(note.named_range_id.as_deref(), Some("nr-1"));
    }

    #[test]
    fn test_apply_save_result_keeps_dirty_after_race() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let note = store.create(None).unwrap();
        store
            .update_content(note.id, "T".into(), "C1".into())
            .unwrap();
        // Content moved on while the save was in flight.
        store
            .update_content(note.id, "T".into(), "C2".into())
            .unwrap();

        let clean = store
            .apply_save_result(note.id, "T", "C1", "nr-1".into())
            .unwrap();
        assert!(!clean);
        let note = store.get(&note.id).unwrap();
        assert!(note.is_dirty, "racing edit keeps the note dirty");
        assert_eq!(
            note.named_range_id.as_deref(),
            Some("nr-1"),
            "fresh anchor is kept even when the edit raced"
        );
    }

    #[test]
    fn test_dirty_ids_ordering() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let a = store.create(None).unwrap();
        let b = store.create(None).unwrap();
        store.update_content(b.id, "B".into(), "b".into()).unwrap();
        store.update_content(a.id, "A".into(), "a".into()).unwrap();

        assert_eq!(store.dirty_ids(), vec![b.id, a.id]);
    }

    #[test]
    fn test_delete_is_local_only() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let note = store.create(None).unwrap();
        store.delete(note.id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.delete(note.id),
            Err(StickydocError::NoteNotFound(_))
        ));
    }

    #[test]
    fn test_find_by_prefix() {
        let tmp = TempDir::new().unwrap();
        let mut store = NoteStore::open(tmp.path()).unwrap();
        let note = store.create(None).unwrap();
        let prefix = &note.id.to_string()[..8];
        assert_eq!(store.find_by_prefix(prefix), Some(note.id));
        assert_eq!(store.find_by_prefix("zzzzzzzz"), None);
    }
}
