//! Wire protocol between the engine and presentation layers.
//!
//! Messages are tagged by an `action` field and dispatched exhaustively.
//! Content-edit events arrive already debounced (~500 ms) by the
//! presentation layer; the engine applies them as-is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Geometry, Note, NoteColor};
use crate::sync::{SaveStatus, StatusEvent};

/// Messages a connected client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateNote {
        #[serde(default)]
        source_url: Option<String>,
    },
    UpdateNoteContent {
        note_id: Uuid,
        title: String,
        content: String,
    },
    UpdateNotePosition {
        note_id: Uuid,
        geometry: Geometry,
    },
    ToggleMinimize {
        note_id: Uuid,
    },
    TogglePin {
        note_id: Uuid,
    },
    SetColor {
        note_id: Uuid,
        color: NoteColor,
    },
    CloseNote {
        note_id: Uuid,
    },
    SaveNote {
        note_id: Uuid,
    },
}

/// Messages pushed to every connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Full-state snapshot, sent on (re)connect.
    InitialNotes { notes: Vec<Note> },
    NoteCreated { note: Note },
    NoteUpdated { note: Note },
    NoteRemoved { note_id: Uuid },
    UpdateStatus {
        note_id: Uuid,
        status: SaveStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl From<StatusEvent> for ServerMessage {
    fn from(event: StatusEvent) -> Self {
        ServerMessage::UpdateStatus {
            note_id: event.note_id,
            status: event.status,
            message: event.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parses_by_action_tag() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"action": "createNote", "sourceUrl": "https://example.com"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::CreateNote { source_url } => {
                assert_eq!(source_url.as_deref(), Some("https://example.com"));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_update_content_fields_camel_cased() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"action": "updateNoteContent", "noteId": "{}", "title": "T", "content": "<p>c</p>"}}"#,
            id
        );
        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        match msg {
            ClientMessage::UpdateNoteContent { note_id, title, .. } => {
                assert_eq!(note_id, id);
                assert_eq!(title, "T");
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"action": "explode"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_message_shape() {
        let id = Uuid::new_v4();
        let msg = ServerMessage::UpdateStatus {
            note_id: id,
            status: SaveStatus::Saving,
            message: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["action"], "updateStatus");
        assert_eq!(json["status"], "saving");
        assert_eq!(json["noteId"], id.to_string());
        assert!(json.get("message").is_none());
    }
}
