//! Tutor command-line host
//!
//! # Usage
//!
//! ```bash
//! tutor chat [--user ID] [--persona student] [--subject maths] [--level higher]
//! tutor resolve "What is 100 - 50 × 2" [--tier foundation] [--json]
//! tutor topics list|show|search
//! tutor review 5 4 3 0
//! tutor practice outcomes.json --student s1 [--strategy focused] [-n 10]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/tutor-core/config.toml)
//! 3. File passed with --config
//! 4. Environment variables (TUTOR_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use tutor_daemon::{
    handle_chat, handle_practice, handle_resolve, handle_review, handle_topics, init_logging,
    load_settings, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Chat {
            user,
            persona,
            subject,
            level,
            goal,
        } => {
            handle_chat(
                &settings,
                &user,
                &persona,
                &subject,
                level.as_deref(),
                goal.as_deref(),
            )
            .await?;
        }
        Commands::Resolve {
            query,
            subject,
            tier,
            json,
        } => {
            handle_resolve(&settings, &query, &subject, tier.as_deref(), json)?;
        }
        Commands::Topics(cmd) => {
            handle_topics(cmd)?;
        }
        Commands::Review { qualities } => {
            handle_review(&qualities)?;
        }
        Commands::Practice {
            outcomes,
            student,
            strategy,
            count,
        } => {
            handle_practice(&settings, &outcomes, &student, &strategy, count).await?;
        }
    }

    Ok(())
}
