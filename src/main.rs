use clap::Parser;
use stickydoc::cli::{
    handle_add, handle_config_set_doc, handle_config_show, handle_delete, handle_get, handle_list,
    handle_save, handle_serve, handle_sync, Cli, Commands, ConfigAction,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { listen } => handle_serve(listen),
        Commands::Add {
            title,
            content,
            source_url,
            color,
            stdin,
            json,
        } => handle_add(title, content, source_url, color, stdin, json),
        Commands::List { json } => handle_list(json),
        Commands::Get { id, json } => handle_get(id, json),
        Commands::Delete { id } => handle_delete(id),
        Commands::Save { id } => handle_save(id),
        Commands::Sync => handle_sync(),
        Commands::Config(config_cmd) => match config_cmd.action {
            ConfigAction::SetDoc { doc_id } => handle_config_set_doc(doc_id),
            ConfigAction::Show => handle_config_show(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
