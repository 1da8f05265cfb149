use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Note geometry, purely presentational; persisted so the UI layer can
/// restore layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    /// Default placement, staggered by creation order so new notes do not
    /// stack exactly on top of each other.
    pub fn staggered(order: usize) -> Self {
        let offset = 60.0 + (order % 10) as f64 * 20.0;
        Self {
            x: offset,
            y: offset,
            width: 350.0,
            height: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
}

impl std::fmt::Display for NoteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteColor::Yellow => write!(f, "yellow"),
            NoteColor::Green => write!(f, "green"),
            NoteColor::Blue => write!(f, "blue"),
            NoteColor::Pink => write!(f, "pink"),
            NoteColor::Purple => write!(f, "purple"),
        }
    }
}

impl std::str::FromStr for NoteColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yellow" => Ok(NoteColor::Yellow),
            "green" => Ok(NoteColor::Green),
            "blue" => Ok(NoteColor::Blue),
            "pink" => Ok(NoteColor::Pink),
            "purple" => Ok(NoteColor::Purple),
            _ => Err(format!("Invalid color: {}", s)),
        }
    }
}

/// A sticky note. The id doubles as the name of the note's named range in
/// the target document, so the local key and the remote lookup key can
/// never drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    /// Rich text as an HTML fragment (see `translate`).
    pub content: String,
    pub geometry: Geometry,
    /// True whenever local content differs from the last confirmed remote
    /// write. Cleared only by a save that round-trips unchanged content.
    pub is_dirty: bool,
    pub is_minimized: bool,
    pub is_pinned: bool,
    pub color: NoteColor,
    /// Opaque remote anchor reference, owned by the save engine. `None`
    /// means never saved, or the server-side anchor was lost.
    pub named_range_id: Option<String>,
    /// Page the note was created on. Set once, never mutated.
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(order: usize, source_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            content: String::new(),
            geometry: Geometry::staggered(order),
            is_dirty: false,
            is_minimized: false,
            is_pinned: false,
            color: NoteColor::default(),
            named_range_id: None,
            source_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// The named-range name used for this note in the target document.
    pub fn range_name(&self) -> String {
        self.id.to_string()
    }
}
