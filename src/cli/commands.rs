use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stickydoc")]
#[command(version, about = "Sticky-note engine that syncs notes into a Google Doc")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine: autosave sweep plus the WebSocket/HTTP surface
    Serve {
        /// Listen address, e.g. 127.0.0.1:7475
        #[arg(long)]
        listen: Option<String>,
    },

    /// Add a new note
    Add {
        /// Note title
        title: String,

        /// Note body as an HTML fragment
        #[arg(long)]
        content: Option<String>,

        /// Page the note belongs to
        #[arg(long = "url")]
        source_url: Option<String>,

        /// Note color (yellow, green, blue, pink, purple)
        #[arg(long, default_value = "yellow")]
        color: String,

        /// Read the body from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note by id (full UUID or unique prefix)
    Get {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note locally (text already synced stays in the document)
    Delete { id: String },

    /// Save one note to the target document now
    Save { id: String },

    /// Save every dirty note now
    Sync,

    /// Configuration
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Set the target Google Doc id
    SetDoc { doc_id: String },

    /// Print current settings
    Show,
}
