//! Named-range bookkeeping.
//!
//! Each note's text lives in the target document under a named range
//! whose *name* is the note id itself, so the local key and the remote
//! lookup key are one and the same. The only durable state is the opaque
//! `namedRangeId` stored on the note after each save.

use tracing::debug;
use uuid::Uuid;

use crate::docs::types::{Range, Reply};
use crate::docs::DocsApi;
use crate::error::{Result, StickydocError};
use crate::store::Note;

/// Where a note's remote anchor currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    /// Never saved: take the create path.
    Absent,
    /// Anchor found; its current live span.
    Live(Range),
    /// An anchor reference is stored but the document does not show it
    /// (propagation lag, or the user removed the marker). Retry later
    /// rather than creating a duplicate entry.
    Indeterminate,
}

/// Resolve the current anchor for a note.
pub async fn resolve(
    api: &dyn DocsApi,
    token: &str,
    doc_id: &str,
    note: &Note,
) -> Result<AnchorState> {
    if note.named_range_id.is_none() {
        return Ok(AnchorState::Absent);
    }

    let ranges = api.named_ranges(token, doc_id).await?;
    match ranges
        .get(&note.range_name())
        .and_then(|spans| spans.first())
    {
        Some(range) => Ok(AnchorState::Live(*range)),
        None => {
            debug!(note = %note.id, "stored anchor not visible in document");
            Ok(AnchorState::Indeterminate)
        }
    }
}

/// Extract the anchor id from a batch reply. The reply is identified by
/// the position the `createNamedRange` request held in the batch, never
/// by scanning for content.
pub fn record(replies: &[Reply], create_index: usize, note_id: Uuid) -> Result<String> {
    replies
        .get(create_index)
        .and_then(|reply| reply.create_named_range.as_ref())
        .map(|reply| reply.named_range_id.clone())
        .ok_or_else(|| {
            StickydocError::UnexpectedReply(format!(
                "no createNamedRange reply at position {} for note {}",
                create_index, note_id
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::mock::MockDocs;
    use crate::docs::types::CreateNamedRangeReply;

    fn note_with_anchor(anchor: Option<&str>) -> Note {
        let mut note = Note::new(0, None);
        note.named_range_id = anchor.map(str::to_string);
        note
    }

    #[tokio::test]
    async fn test_resolve_absent_without_stored_anchor() {
        let mock = MockDocs::new();
        let note = note_with_anchor(None);
        let state = resolve(&mock, "tok", "doc", &note).await.unwrap();
        assert_eq!(state, AnchorState::Absent);
    }

    #[tokio::test]
    async fn test_resolve_live_anchor() {
        let mock = MockDocs::new();
        let note = note_with_anchor(Some("kix.old"));
        mock.seed_named_range(&note.range_name(), Range::new(4, 30));

        let state = resolve(&mock, "tok", "doc", &note).await.unwrap();
        assert_eq!(state, AnchorState::Live(Range::new(4, 30)));
    }

    #[tokio::test]
    async fn test_resolve_missing_anchor_is_indeterminate() {
        // A stored reference the document no longer shows must not fall
        // back to the create path.
        let mock = MockDocs::new();
        let note = note_with_anchor(Some("kix.old"));

        let state = resolve(&mock, "tok", "doc", &note).await.unwrap();
        assert_eq!(state, AnchorState::Indeterminate);
    }

    #[test]
    fn test_record_reads_reply_by_position() {
        let replies = vec![
            Reply::default(),
            Reply {
                create_named_range: Some(CreateNamedRangeReply {
                    named_range_id: "kix.new".to_string(),
                }),
            },
        ];
        let id = Uuid::new_v4();
        assert_eq!(record(&replies, 1, id).unwrap(), "kix.new");
        assert!(record(&replies, 0, id).is_err());
        assert!(record(&replies, 5, id).is_err());
    }
}
