//! WebSocket/HTTP surface for presentation layers.
//!
//! Clients connect over `/ws`, receive a full-state snapshot, then a
//! stream of note events and save-status transitions. Inbound messages
//! are note CRUD and edit events; a `saveNote` kicks off a manual save
//! without blocking the session loop. `/notes` serves the same snapshot
//! over plain HTTP.

pub mod protocol;

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::select;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::Note;
use crate::sync::SyncEngine;

use protocol::{ClientMessage, ServerMessage};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub events_tx: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { engine, events_tx }
    }

    fn publish(&self, message: ServerMessage) {
        let _ = self.events_tx.send(message);
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notes", get(list_notes))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Run the surface until the listener fails or the process stops.
pub async fn serve(engine: Arc<SyncEngine>, listen: &str) -> Result<()> {
    let state = AppState::new(engine.clone());

    // Bridge save-status transitions onto the client event stream.
    let mut status_rx = engine.subscribe();
    let bridge = state.events_tx.clone();
    tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(event) => {
                    let _ = bridge.send(event.into());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "status bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listener.local_addr()?, "surface listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn list_notes(State(state): State<AppState>) -> Json<Vec<Note>> {
    let store = state.engine.store().lock().await;
    Json(store.list())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before the snapshot so no event lands in the gap.
    let mut events_rx = state.events_tx.subscribe();
    if send_snapshot(&state, &mut sink).await.is_err() {
        return;
    }

    loop {
        select! {
            event = events_rx.recv() => match event {
                Ok(message) => {
                    if send_message(&mut sink, &message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A slow client missed events; resend the full state.
                    warn!(skipped, "client fell behind; resyncing");
                    if send_snapshot(&state, &mut sink).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => {
                if !handle_incoming(&state, incoming).await {
                    break;
                }
            }
        }
    }
}

async fn handle_incoming(
    state: &AppState,
    incoming: Option<std::result::Result<Message, axum::Error>>,
) -> bool {
    match incoming {
        Some(Ok(Message::Text(raw))) => {
            match serde_json::from_str::<ClientMessage>(raw.as_str()) {
                Ok(message) => {
                    if let Err(err) = dispatch(state, message).await {
                        warn!(error = %err, "client message failed");
                    }
                }
                Err(err) => warn!(error = %err, "unparseable client message"),
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => false,
        Some(Ok(_)) => true, // ping/pong/binary: nothing to do
        Some(Err(err)) => {
            debug!(error = %err, "websocket receive error");
            false
        }
    }
}

async fn dispatch(state: &AppState, message: ClientMessage) -> Result<()> {
    match message {
        ClientMessage::CreateNote { source_url } => {
            let note = {
                let mut store = state.engine.store().lock().await;
                store.create(source_url)?
            };
            state.publish(ServerMessage::NoteCreated { note });
        }
        ClientMessage::UpdateNoteContent {
            note_id,
            title,
            content,
        } => {
            let note = {
                let mut store = state.engine.store().lock().await;
                store.update_content(note_id, title, content)?
            };
            state.publish(ServerMessage::NoteUpdated { note });
        }
        ClientMessage::UpdateNotePosition { note_id, geometry } => {
            let mut store = state.engine.store().lock().await;
            store.update_geometry(note_id, geometry)?;
        }
        ClientMessage::ToggleMinimize { note_id } => {
            let note = {
                let mut store = state.engine.store().lock().await;
                store.toggle_minimized(note_id)?;
                store.get(&note_id).cloned()
            };
            if let Some(note) = note {
                state.publish(ServerMessage::NoteUpdated { note });
            }
        }
        ClientMessage::TogglePin { note_id } => {
            let note = {
                let mut store = state.engine.store().lock().await;
                store.toggle_pinned(note_id)?;
                store.get(&note_id).cloned()
            };
            if let Some(note) = note {
                state.publish(ServerMessage::NoteUpdated { note });
            }
        }
        ClientMessage::SetColor { note_id, color } => {
            let note = {
                let mut store = state.engine.store().lock().await;
                store.set_color(note_id, color)?;
                store.get(&note_id).cloned()
            };
            if let Some(note) = note {
                state.publish(ServerMessage::NoteUpdated { note });
            }
        }
        ClientMessage::CloseNote { note_id } => {
            {
                let mut store = state.engine.store().lock().await;
                store.delete(note_id)?;
            }
            state.publish(ServerMessage::NoteRemoved { note_id });
        }
        ClientMessage::SaveNote { note_id } => {
            // Manual save; runs off the session loop. Status transitions
            // reach clients through the event stream.
            let engine = state.engine.clone();
            tokio::spawn(async move {
                if let Err(err) = engine.save(note_id, true).await {
                    warn!(note = %note_id, error = %err, "manual save failed");
                }
            });
        }
    }
    Ok(())
}

type WsSink = SplitSink<WebSocket, Message>;

async fn send_snapshot(state: &AppState, sink: &mut WsSink) -> Result<()> {
    let notes = {
        let store = state.engine.store().lock().await;
        store.list()
    };
    send_message(sink, &ServerMessage::InitialNotes { notes }).await
}

async fn send_message(sink: &mut WsSink, message: &ServerMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    sink.send(Message::Text(json.into())).await.map_err(|e| {
        crate::error::StickydocError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            e.to_string(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::docs::auth::{CachedToken, TokenSource};
    use crate::docs::mock::MockDocs;
    use crate::store::NoteStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StaticTokens;

    #[async_trait]
    impl TokenSource for StaticTokens {
        async fn fetch(&self, _interactive: bool) -> Result<String> {
            Ok("tok".to_string())
        }
    }

    fn state(tmp: &TempDir) -> AppState {
        let store = NoteStore::open(tmp.path()).unwrap().shared();
        let config = Arc::new(Config {
            data_dir: tmp.path().to_path_buf(),
            doc_id: Some("doc-1".to_string()),
            ..Config::default()
        });
        let engine = Arc::new(SyncEngine::new(
            store,
            Arc::new(MockDocs::new()),
            CachedToken::new(Arc::new(StaticTokens)),
            config,
        ));
        AppState::new(engine)
    }

    #[tokio::test]
    async fn test_dispatch_create_edit_close_cycle() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);
        let mut events = state.events_tx.subscribe();

        dispatch(&state, ClientMessage::CreateNote { source_url: None })
            .await
            .unwrap();
        let created = match events.recv().await.unwrap() {
            ServerMessage::NoteCreated { note } => note,
            other => panic!("expected noteCreated, got {:?}", other),
        };

        dispatch(
            &state,
            ClientMessage::UpdateNoteContent {
                note_id: created.id,
                title: "T".into(),
                content: "<p>c</p>".into(),
            },
        )
        .await
        .unwrap();
        match events.recv().await.unwrap() {
            ServerMessage::NoteUpdated { note } => assert!(note.is_dirty),
            other => panic!("expected noteUpdated, got {:?}", other),
        }

        dispatch(&state, ClientMessage::CloseNote { note_id: created.id })
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            ServerMessage::NoteRemoved { note_id } => assert_eq!(note_id, created.id),
            other => panic!("expected noteRemoved, got {:?}", other),
        }

        let store = state.engine.store().lock().await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_note_errors() {
        let tmp = TempDir::new().unwrap();
        let state = state(&tmp);
        let result = dispatch(
            &state,
            ClientMessage::CloseNote {
                note_id: uuid::Uuid::new_v4(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
