pub mod commands;
pub mod handlers;

pub use commands::{Cli, Commands, ConfigAction, ConfigCommand};
pub use handlers::{
    handle_add, handle_config_set_doc, handle_config_show, handle_delete, handle_get, handle_list,
    handle_save, handle_serve, handle_sync,
};
