use thiserror::Error;

#[derive(Error, Debug)]
pub enum StickydocError {
    #[error("No target document configured. Run 'stickydoc config set-doc <DOC_ID>' first.")]
    NotConfigured,

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transient sync failure: {0}")]
    Transient(String),

    #[error("Docs API rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected batch reply: {0}")]
    UnexpectedReply(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StickydocError {
    /// Failures worth retrying on the next autosave sweep without surfacing
    /// an error badge to the user.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Http(_))
    }

    /// Failures that indicate the cached bearer token is no longer good.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Api { status, message } => {
                *status == 401 || *status == 403 || message.to_lowercase().contains("token")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StickydocError>;
