use std::io::{self, Read};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::{self, Config};
use crate::docs::{CachedToken, DocsClient, FileTokenSource};
use crate::error::{Result, StickydocError};
use crate::server;
use crate::store::{Note, NoteColor, NoteStore};
use crate::sync::{Autosave, SaveOutcome, SyncEngine};

fn load_config() -> Result<Config> {
    Config::load(config::default_data_dir())
}

fn open_store(config: &Config) -> Result<NoteStore> {
    NoteStore::open(&config.data_dir)
}

fn build_engine(config: Config) -> Result<Arc<SyncEngine>> {
    let store = open_store(&config)?.shared();
    let token = CachedToken::new(Arc::new(FileTokenSource::new(&config.data_dir)));
    let api = Arc::new(DocsClient::new(config.api_base.clone()));
    Ok(Arc::new(SyncEngine::new(
        store,
        api,
        token,
        Arc::new(config),
    )))
}

fn resolve_id(store: &NoteStore, raw: &str) -> Result<Uuid> {
    store
        .find_by_prefix(raw)
        .ok_or_else(|| StickydocError::NoteNotFound(raw.to_string()))
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..7].to_string()
}

fn print_note(note: &Note) {
    let dirty = if note.is_dirty { "*" } else { " " };
    let title = if note.title.is_empty() {
        "(untitled)"
    } else {
        &note.title
    };
    println!(
        "{} {}  {}  [{}]  {}",
        dirty,
        short_id(&note.id),
        title,
        note.color,
        note.updated_at.format("%Y-%m-%d %H:%M"),
    );
}

pub fn handle_add(
    title: String,
    content: Option<String>,
    source_url: Option<String>,
    color: String,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let mut store = open_store(&config)?;

    let content = if stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        content.unwrap_or_default()
    };

    let color: NoteColor = color.parse().unwrap_or_default();

    let note = store.create(source_url)?;
    store.set_color(note.id, color)?;
    let note = store.update_content(note.id, title, content)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Created note {} - {}", short_id(&note.id), note.title);
    }
    Ok(())
}

pub fn handle_list(json: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let notes = store.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes yet. Create one with 'stickydoc add <TITLE>'.");
        return Ok(());
    }
    for note in &notes {
        print_note(note);
    }
    println!("\n{} note(s), {} dirty", notes.len(), store.dirty_ids().len());
    Ok(())
}

pub fn handle_get(id: String, json: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let id = resolve_id(&store, &id)?;
    let note = store
        .get(&id)
        .ok_or_else(|| StickydocError::NoteNotFound(id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
        return Ok(());
    }

    println!("id:         {}", note.id);
    println!("title:      {}", note.title);
    println!("color:      {}", note.color);
    println!("dirty:      {}", note.is_dirty);
    println!("pinned:     {}", note.is_pinned);
    println!("minimized:  {}", note.is_minimized);
    println!(
        "anchor:     {}",
        note.named_range_id.as_deref().unwrap_or("(never saved)")
    );
    if let Some(url) = &note.source_url {
        println!("source:     {}", url);
    }
    println!("created:    {}", note.created_at.to_rfc3339());
    println!("updated:    {}", note.updated_at.to_rfc3339());
    println!("\n{}", note.content);
    Ok(())
}

pub fn handle_delete(id: String) -> Result<()> {
    let config = load_config()?;
    let mut store = open_store(&config)?;
    let id = resolve_id(&store, &id)?;
    let note = store.delete(id)?;
    println!(
        "Deleted note {} locally; any synced text stays in the document.",
        short_id(&note.id)
    );
    Ok(())
}

pub fn handle_save(id: String) -> Result<()> {
    let config = load_config()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let engine = build_engine(config)?;
        let id = {
            let store = engine.store().lock().await;
            resolve_id(&store, &id)?
        };
        report_outcome(&id, engine.save(id, true).await?)
    })
}

pub fn handle_sync() -> Result<()> {
    let config = load_config()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let engine = build_engine(config)?;
        let dirty = {
            let store = engine.store().lock().await;
            store.dirty_ids()
        };
        if dirty.is_empty() {
            println!("Nothing to sync.");
            return Ok(());
        }
        println!("Syncing {} note(s)...", dirty.len());
        let mut failed = Vec::new();
        for id in dirty {
            match engine.save(id, true).await? {
                SaveOutcome::Failed(message) => failed.push((id, message)),
                outcome => {
                    report_outcome(&id, outcome)?;
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            for (id, message) in &failed {
                eprintln!("{}: {}", short_id(id), message);
            }
            Err(StickydocError::SaveFailed(format!(
                "{} note(s) failed to sync",
                failed.len()
            )))
        }
    })
}

fn report_outcome(id: &Uuid, outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Saved => {
            println!("Saved {}", short_id(id));
            Ok(())
        }
        SaveOutcome::SkippedEmpty => {
            println!("{} is empty; nothing to save", short_id(id));
            Ok(())
        }
        SaveOutcome::Deferred => {
            println!(
                "{} deferred (transient failure); it will retry on the next sweep",
                short_id(id)
            );
            Ok(())
        }
        SaveOutcome::Busy => {
            println!("{} deferred; another save is in flight", short_id(id));
            Ok(())
        }
        SaveOutcome::Failed(message) => Err(StickydocError::SaveFailed(message)),
    }
}

pub fn handle_config_set_doc(doc_id: String) -> Result<()> {
    let mut config = load_config()?;
    config.doc_id = Some(doc_id.clone());
    config.save()?;
    println!("Target document set to {}", doc_id);
    Ok(())
}

pub fn handle_config_show() -> Result<()> {
    let config = load_config()?;
    println!("data dir:       {}", config.data_dir.display());
    println!(
        "target doc:     {}",
        config.doc_id.as_deref().unwrap_or("(not configured)")
    );
    println!("autosave every: {}s", config.autosave_secs);
    println!("api base:       {}", config.api_base);
    println!("listen:         {}", config.listen);
    Ok(())
}

pub fn handle_serve(listen: Option<String>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stickydoc=info")),
        )
        .init();

    let mut config = load_config()?;
    if let Some(listen) = listen {
        config.listen = listen;
    }
    if !config.is_configured() {
        eprintln!(
            "Warning: no target document configured; notes will not sync.\n\
             Run 'stickydoc config set-doc <DOC_ID>' to finish setup."
        );
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let engine = build_engine(config.clone())?;

        let autosave = Autosave::new(engine.clone()).start();

        let listen = config.listen.clone();
        let surface_engine = engine.clone();
        let surface = tokio::spawn(async move { server::serve(surface_engine, &listen).await });

        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        autosave.shutdown().await;
        surface.abort();
        Ok(())
    })
}
