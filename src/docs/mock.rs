//! Scripted in-memory Docs backend for deterministic engine tests.
//!
//! Tracks named ranges by name, logs every submitted batch, and builds
//! positionally aligned replies the way the real API does. A gate lets a
//! test hold a batch in flight while it races edits or other saves
//! against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{Result, StickydocError};

use super::types::{CreateNamedRangeReply, Range, Reply, Request};
use super::DocsApi;

#[derive(Default)]
struct MockState {
    named_ranges: HashMap<String, Vec<Range>>,
    end_index: u32,
    batches: Vec<Vec<Request>>,
    fail_next_batch: Option<StickydocError>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct MockDocs {
    state: Arc<Mutex<MockState>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MockDocs {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().end_index = 2;
        mock
    }

    /// Install a gate: every subsequent batch update blocks until the
    /// returned handle is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Script a failure for the next batch update.
    pub fn fail_next_batch(&self, err: StickydocError) {
        self.state.lock().unwrap().fail_next_batch = Some(err);
    }

    /// Pre-seed a named range, as if written by an earlier save.
    pub fn seed_named_range(&self, name: &str, range: Range) {
        self.state
            .lock()
            .unwrap()
            .named_ranges
            .insert(name.to_string(), vec![range]);
    }

    /// Remove a named range, simulating a user edit that destroyed the
    /// marker (or propagation lag).
    pub fn drop_named_range(&self, name: &str) {
        self.state.lock().unwrap().named_ranges.remove(name);
    }

    /// Every batch submitted so far.
    pub fn batches(&self) -> Vec<Vec<Request>> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn batch_count(&self) -> usize {
        self.state.lock().unwrap().batches.len()
    }
}

#[async_trait]
impl DocsApi for MockDocs {
    async fn named_ranges(
        &self,
        _token: &str,
        _doc_id: &str,
    ) -> Result<HashMap<String, Vec<Range>>> {
        Ok(self.state.lock().unwrap().named_ranges.clone())
    }

    async fn end_index(&self, _token: &str, _doc_id: &str) -> Result<u32> {
        Ok(self.state.lock().unwrap().end_index)
    }

    async fn batch_update(
        &self,
        _token: &str,
        _doc_id: &str,
        requests: Vec<Request>,
    ) -> Result<Vec<Reply>> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_next_batch.take() {
            state.batches.push(requests);
            return Err(err);
        }

        let mut replies = Vec::with_capacity(requests.len());
        for request in &requests {
            match request {
                Request::CreateNamedRange { name, range } => {
                    state.next_id += 1;
                    let id = format!("kix.mock{}", state.next_id);
                    state.named_ranges.insert(name.clone(), vec![*range]);
                    replies.push(Reply {
                        create_named_range: Some(CreateNamedRangeReply {
                            named_range_id: id,
                        }),
                    });
                }
                _ => replies.push(Reply::default()),
            }
        }

        state.batches.push(requests);
        Ok(replies)
    }
}
