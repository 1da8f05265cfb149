//! Note synchronization: anchor ledger, save engine, autosave sweep.

mod engine;
mod ledger;
mod scheduler;

pub use engine::{SaveOutcome, SyncEngine};
pub use ledger::AnchorState;
pub use scheduler::{Autosave, AutosaveHandle};

use serde::Serialize;
use uuid::Uuid;

/// Per-note status surfaced to presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

/// One status transition, broadcast from the save engine.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub note_id: Uuid,
    pub status: SaveStatus,
    /// Full error message, shown on demand while the short label is
    /// displayed inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
