//! Library side of the `tutor` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (chat, resolve, topics, review, practice)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, TopicsCommand};
pub use commands::{
    handle_chat, handle_practice, handle_resolve, handle_review, handle_topics, init_logging,
    load_settings, parse_chat_command, parse_persona, parse_tier, read_outcomes, replay_reviews,
    ChatCommand,
};
