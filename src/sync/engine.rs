//! The save engine.
//!
//! Owns the only mutable coordination state in the system: the global
//! single-flight lock, the cached bearer token, and the status channel.
//! One save runs at a time across the whole collection; anything that
//! arrives while a save is in flight is marked dirty and picked up by the
//! next sweep.
//!
//! Every text index handed to the API is a UTF-16 code unit count, and
//! every offset is derived from the length of the string actually being
//! inserted, never from an assumed label width.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::docs::types::{Location, ParagraphStyle, Range};
use crate::docs::{CachedToken, DocsApi, Request};
use crate::error::{Result, StickydocError};
use crate::store::{Note, SharedStore};
use crate::translate::{translate, utf16_len, Translated};

use super::ledger::{self, AnchorState};
use super::{SaveStatus, StatusEvent};

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// What became of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The batch was accepted and the ledger updated.
    Saved,
    /// Another save was in flight; the note was marked dirty instead.
    Busy,
    /// Nothing to write: blank title and tag-stripped-blank content.
    SkippedEmpty,
    /// Transient failure; the note stays dirty and the next sweep retries.
    Deferred,
    /// The save failed and the error was surfaced.
    Failed(String),
}

pub struct SyncEngine {
    store: SharedStore,
    api: Arc<dyn DocsApi>,
    token: CachedToken,
    config: Arc<Config>,
    status_tx: broadcast::Sender<StatusEvent>,
    save_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: SharedStore,
        api: Arc<dyn DocsApi>,
        token: CachedToken,
        config: Arc<Config>,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            store,
            api,
            token,
            config,
            status_tx,
            save_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to per-note status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    fn broadcast(&self, note_id: Uuid, status: SaveStatus, message: Option<String>) {
        let _ = self.status_tx.send(StatusEvent {
            note_id,
            status,
            message,
        });
    }

    /// Save one note to the target document.
    ///
    /// `manual` marks a user-initiated save: token acquisition may be
    /// interactive, and configuration problems surface immediately
    /// instead of waiting on a sweep.
    pub async fn save(&self, note_id: Uuid, manual: bool) -> Result<SaveOutcome> {
        let snapshot = {
            let store = self.store.lock().await;
            store
                .get(&note_id)
                .cloned()
                .ok_or_else(|| StickydocError::NoteNotFound(note_id.to_string()))?
        };

        let translated = translate(&snapshot.content);
        if snapshot.title.trim().is_empty() && translated.is_empty() {
            debug!(note = %note_id, "nothing to save; skipping");
            return Ok(SaveOutcome::SkippedEmpty);
        }

        let guard = match self.save_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                // Someone else is saving. Do not wait: dirty-mark and let
                // the next sweep pick this note up.
                let mut store = self.store.lock().await;
                store.mark_dirty(note_id)?;
                debug!(note = %note_id, "save in flight elsewhere; deferred");
                return Ok(SaveOutcome::Busy);
            }
        };

        self.broadcast(note_id, SaveStatus::Saving, None);

        let result = self.save_flight(&snapshot, &translated, manual).await;

        let outcome = match result {
            Ok(range_id) => {
                let mut store = self.store.lock().await;
                let clean = store.apply_save_result(
                    note_id,
                    &snapshot.title,
                    &snapshot.content,
                    range_id,
                )?;
                if clean {
                    info!(note = %note_id, "note saved");
                } else {
                    info!(note = %note_id, "note saved, but an edit raced it; staying dirty");
                }
                self.broadcast(note_id, SaveStatus::Saved, None);
                SaveOutcome::Saved
            }
            Err(err) if err.is_transient() => {
                warn!(note = %note_id, error = %err, "transient save failure; retrying next sweep");
                self.broadcast(note_id, SaveStatus::Idle, None);
                SaveOutcome::Deferred
            }
            Err(err) => {
                if err.is_auth() {
                    self.token.evict().await;
                }
                error!(note = %note_id, error = %err, "save failed");
                let message = err.to_string();
                self.broadcast(note_id, SaveStatus::Error, Some(message.clone()));
                SaveOutcome::Failed(message)
            }
        };

        // Finalizer: flush the collection, then give the lock back.
        {
            let mut store = self.store.lock().await;
            store.persist_all()?;
        }
        drop(guard);

        Ok(outcome)
    }

    async fn save_flight(
        &self,
        snapshot: &Note,
        translated: &Translated,
        manual: bool,
    ) -> Result<String> {
        let doc_id = self.config.doc_id()?.to_string();
        let token = self.token.acquire(manual).await?;

        let anchor = ledger::resolve(self.api.as_ref(), &token, &doc_id, snapshot).await?;

        let (requests, create_index) = match anchor {
            AnchorState::Live(existing) => {
                build_requests(snapshot, translated, existing.start_index, Some(existing))
            }
            AnchorState::Absent => {
                let end = self.api.end_index(&token, &doc_id).await?;
                // The document's final newline cannot be written past.
                let insert_at = end.saturating_sub(1).max(1);
                build_requests(snapshot, translated, insert_at, None)
            }
            AnchorState::Indeterminate => {
                return Err(StickydocError::Transient(format!(
                    "named range '{}' not visible yet",
                    snapshot.range_name()
                )));
            }
        };

        let replies = self.api.batch_update(&token, &doc_id, requests).await?;
        ledger::record(&replies, create_index, snapshot.id)
    }
}

/// The composed block written for one note.
struct Composed {
    full_text: String,
    title_len16: u32,
    content_offset16: u32,
}

fn compose(snapshot: &Note, translated: &Translated, first_write: bool) -> Composed {
    let now = Local::now();
    let date = now.format("%A, %B %-d, %Y").to_string();
    let time = now.format("%-I:%M %p").to_string();

    let title = snapshot.title.trim();
    let title_line = if title.is_empty() {
        format!("Note from {}", date)
    } else {
        title.to_string()
    };

    let verb = if first_write { "Created" } else { "Updated" };
    let stamp_line = format!("{}: {} at {}\n", verb, date, time);
    let content_label = "Content:\n";

    let full_text = format!(
        "{}\n{}{}{}\n\n",
        title_line, stamp_line, content_label, translated.plain_text
    );

    let title_len16 = utf16_len(&title_line) as u32;
    let content_offset16 =
        title_len16 + 1 + utf16_len(&stamp_line) as u32 + utf16_len(content_label) as u32;

    Composed {
        full_text,
        title_len16,
        content_offset16,
    }
}

/// Build the atomic request sequence for one save. On the update path the
/// old span is deleted first and the anchor recreated over the new span;
/// resizing in place after a delete+insert is not reliable across the API
/// boundary, so the anchor is always recreated.
fn build_requests(
    snapshot: &Note,
    translated: &Translated,
    insert_at: u32,
    existing: Option<Range>,
) -> (Vec<Request>, usize) {
    let composed = compose(snapshot, translated, existing.is_none());
    let mut requests = Vec::new();

    if let Some(range) = existing {
        requests.push(Request::DeleteContentRange { range });
    }

    requests.push(Request::InsertText {
        location: Location { index: insert_at },
        text: composed.full_text.clone(),
    });

    requests.push(Request::UpdateParagraphStyle {
        range: Range::new(insert_at, insert_at + composed.title_len16),
        paragraph_style: ParagraphStyle {
            named_style_type: "HEADING_1".to_string(),
        },
        fields: "namedStyleType".to_string(),
    });

    let content_start = insert_at + composed.content_offset16;
    for op in &translated.ops {
        requests.push(Request::from_op(op, content_start));
    }

    let create_index = requests.len();
    requests.push(Request::CreateNamedRange {
        name: snapshot.range_name(),
        range: Range::new(
            insert_at,
            insert_at + utf16_len(&composed.full_text) as u32,
        ),
    });

    (requests, create_index)
}
