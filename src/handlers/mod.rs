//! Command handler modules
//!
//! This module contains the command handler functions behind each CLI
//! subcommand, organized by functionality area.

pub mod config;
pub mod inspect;
pub mod merge;

pub use config::{handle_config_show, handle_config_update, ConfigUpdate};
pub use inspect::{handle_check, handle_inspect};
pub use merge::{handle_merge, MergeOptions};
