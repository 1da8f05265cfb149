pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod server;
pub mod store;
pub mod sync;
pub mod translate;

pub use config::Config;
pub use error::{Result, StickydocError};
pub use store::NoteStore;
pub use sync::{Autosave, SaveOutcome, SyncEngine};
