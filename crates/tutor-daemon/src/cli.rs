//! CLI argument parsing for the `tutor` binary.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tutoring core
///
/// Curriculum-grounded tutoring sessions, topic lookup and practice
/// scheduling from the command line.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/tutor-core/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive tutoring session
    Chat {
        /// Learner id
        #[arg(short, long, default_value = "learner")]
        user: String,

        /// Caller role (student, tutor, client, agent)
        #[arg(short, long, default_value = "student")]
        persona: String,

        /// Subject key for curriculum grounding
        #[arg(short, long, default_value = "maths")]
        subject: String,

        /// Level or exam tier (foundation, higher)
        #[arg(long)]
        level: Option<String>,

        /// Session goal shown to the model
        #[arg(long)]
        goal: Option<String>,
    },

    /// Resolve a query to curriculum topics
    Resolve {
        /// Free-text query
        query: String,

        /// Subject key
        #[arg(short, long, default_value = "maths")]
        subject: String,

        /// Learner tier (foundation, higher)
        #[arg(long)]
        tier: Option<String>,

        /// Print the context as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse the curriculum graph
    #[command(subcommand)]
    Topics(TopicsCommand),

    /// Replay SM-2 reviews and print the schedule after each one
    Review {
        /// Recall qualities (0-5), oldest first
        #[arg(required = true)]
        qualities: Vec<u8>,
    },

    /// Apply practice outcomes and plan a practice session
    Practice {
        /// JSON file holding an array of practice outcomes
        outcomes: PathBuf,

        /// Student to plan for
        #[arg(short = 'u', long)]
        student: String,

        /// Session strategy (focused, interleaved)
        #[arg(short, long, default_value = "interleaved")]
        strategy: String,

        /// Number of problems
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TopicsCommand {
    /// List top-level topics, or children of a topic
    List {
        /// Parent topic id
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show one topic with its prerequisites
    Show {
        /// Topic id
        topic_id: String,
    },

    /// Search topics by keyword
    Search {
        /// Keyword (name, description, vocabulary, objectives)
        keyword: String,
    },
}
