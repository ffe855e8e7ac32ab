//! Command implementations for the `tutor` binary.
//!
//! Handles:
//! - chat: interactive session over stdin/stdout
//! - resolve: query-to-topic resolution
//! - topics: curriculum graph browsing
//! - review: SM-2 replay
//! - practice: outcome ingestion, gap detection and session planning

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tutor_curriculum::{builtin_graph, CurriculumGraph, TopicResolver, TopicTier};
use tutor_orchestrator::{score_response, LearnerFeedback, SessionStart, ToolCall, TutorContext};
use tutor_scheduler::{
    InMemoryPracticeStore, OutcomeWorker, PracticeOutcome, PracticeScheduler, PracticeStrategy,
    SpacedRepetitionSchedule,
};
use tutor_types::{Persona, Settings};

use crate::cli::TopicsCommand;

/// Load settings and apply the CLI log level override.
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins when set.
///
/// Logs go to stderr so chat output stays clean.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn load_graph() -> Result<Arc<CurriculumGraph>> {
    Ok(Arc::new(builtin_graph().context("Failed to load curriculum")?))
}

pub fn parse_tier(value: &str) -> Result<TopicTier> {
    match value.trim().to_lowercase().as_str() {
        "foundation" => Ok(TopicTier::Foundation),
        "higher" => Ok(TopicTier::Higher),
        other => bail!("Unknown tier '{}' (expected foundation or higher)", other),
    }
}

pub fn parse_persona(value: &str) -> Result<Persona> {
    Persona::parse(value)
        .with_context(|| format!("Unknown persona '{}' (expected student, tutor, client or agent)", value))
}

/// Chat input that is a command rather than a learner message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Quit,
    /// Rate the last reply
    Feedback(LearnerFeedback),
    /// Host result for the last reply's tool call
    ToolResult(serde_json::Value),
}

/// Parse a `/` command. Returns `None` for ordinary messages.
pub fn parse_chat_command(line: &str) -> Option<Result<ChatCommand>> {
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "quit" | "exit" => Ok(ChatCommand::Quit),
        "up" => Ok(ChatCommand::Feedback(LearnerFeedback::ThumbsUp)),
        "down" => Ok(ChatCommand::Feedback(LearnerFeedback::ThumbsDown)),
        "rate" => arg
            .parse::<u8>()
            .with_context(|| format!("Usage: /rate 1-5 (got '{}')", arg))
            .and_then(|value| Ok(LearnerFeedback::rating(value)?))
            .map(ChatCommand::Feedback),
        "result" => serde_json::from_str(arg)
            .context("Usage: /result <tool result JSON>")
            .map(ChatCommand::ToolResult),
        other => Err(anyhow::anyhow!(
            "Unknown command '/{}' (try /rate, /up, /down, /result or /quit)",
            other
        )),
    };
    Some(command)
}

/// Run an interactive session until EOF, `/quit` or Ctrl-C.
///
/// `/rate N`, `/up` and `/down` score the last reply; `/result <json>`
/// reports the host's outcome for the last reply's tool call.
pub async fn handle_chat(
    settings: &Settings,
    user: &str,
    persona: &str,
    subject: &str,
    level: Option<&str>,
    goal: Option<&str>,
) -> Result<()> {
    let persona = parse_persona(persona)?;
    let ctx = TutorContext::builder()
        .with_settings(settings)
        .context("Invalid provider configuration")?
        .with_curriculum(load_graph()?)
        .build();

    let mut start = SessionStart::new(user, persona).with_subject(subject);
    if let Some(level) = level {
        start = start.with_level(level);
    }
    if let Some(goal) = goal {
        start = start.with_goal(goal);
    }
    let session = ctx.start_session(start);

    info!(
        session_id = %session.session_id,
        providers = ?ctx.providers().names(),
        "Chat session started"
    );
    println!(
        "Tutor session {} ({}). Type /quit to leave, /rate 1-5 to score a reply.",
        session.session_id, persona
    );

    let mut last_reply: Option<String> = None;
    let mut pending_call: Option<ToolCall> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_chat_command(line) {
            None => {}
            Some(Ok(ChatCommand::Quit)) => break,
            Some(Ok(ChatCommand::Feedback(feedback))) => {
                let Some(reply) = last_reply.as_deref() else {
                    println!("Nothing to rate yet.");
                    continue;
                };
                let score = score_response(reply, Some(feedback));
                info!(
                    session_id = %session.session_id,
                    feedback = ?feedback,
                    composite = score.composite,
                    "Reply rated"
                );
                println!(
                    "Thanks. Reply score {:.2} (explanation {:.2}, understanding {:.2}).",
                    score.composite, score.explanation_quality, score.understanding_promotion
                );
                continue;
            }
            Some(Ok(ChatCommand::ToolResult(value))) => {
                let Some(call) = pending_call.as_ref() else {
                    println!("No tool call is waiting for a result.");
                    continue;
                };
                match ctx.record_tool_result(&session.session_id, call, value) {
                    Ok(result) => {
                        println!("Recorded {} result.", result.name());
                        pending_call = None;
                    }
                    Err(e) => println!("{}", e),
                }
                continue;
            }
            Some(Err(e)) => {
                println!("{:#}", e);
                continue;
            }
        }

        let reply = ctx
            .process_message(&session.session_id, line)
            .await
            .context("Session is no longer available")?;

        debug!(
            provider = ?reply.metadata.provider_used,
            intent = reply.metadata.intent.category.as_str(),
            mode = ?reply.metadata.mode.as_ref().map(|m| m.mode),
            degraded = reply.metadata.degraded,
            "Turn complete"
        );

        println!("\n{}\n", reply.content);
        if let Some(call) = &reply.metadata.tool_call {
            println!("Tool call: {}", serde_json::to_string(call)?);
        }
        if !reply.suggestions.is_empty() {
            println!("Try next:");
            for suggestion in &reply.suggestions {
                println!("  - {}", suggestion);
            }
            println!();
        }
        pending_call = reply.metadata.tool_call;
        last_reply = Some(reply.content);
    }

    let ended = ctx.end_session(&session.session_id)?;
    let topics: Vec<&str> = ended.topics_covered.iter().map(String::as_str).collect();
    println!(
        "Session ended after {} messages. Topics covered: {}",
        ended.messages.len(),
        if topics.is_empty() { "none".to_string() } else { topics.join(", ") }
    );
    Ok(())
}

pub fn handle_resolve(
    settings: &Settings,
    query: &str,
    subject: &str,
    tier: Option<&str>,
    json: bool,
) -> Result<()> {
    let tier = tier.map(parse_tier).transpose()?;
    let resolver = TopicResolver::with_config(load_graph()?, settings.resolver.clone());

    let Some(context) = resolver.build_context(query, subject, tier) else {
        println!("No curriculum topic matched.");
        return Ok(());
    };

    if json {
        let out = serde_json::to_string_pretty(&context).context("Failed to serialize context")?;
        println!("{}", out);
        return Ok(());
    }

    for m in &context.matches {
        println!(
            "{:<28} {:.2}  [{}]",
            m.topic_id,
            m.confidence,
            m.matched_keywords.join(", ")
        );
    }
    println!();
    println!("{}", context.to_prompt_section());
    Ok(())
}

pub fn handle_topics(cmd: TopicsCommand) -> Result<()> {
    let graph = load_graph()?;

    match cmd {
        TopicsCommand::List { parent } => {
            let topics = match parent.as_deref() {
                Some(parent) => graph.children(parent),
                None => graph.top_level(),
            };
            if topics.is_empty() {
                println!("No topics found.");
            }
            for topic in topics {
                println!("{:<28} {}", topic.id, topic.name);
            }
        }
        TopicsCommand::Show { topic_id } => {
            let topic = graph
                .get_topic(&topic_id)
                .with_context(|| format!("Topic not found: {}", topic_id))?;
            println!("{} ({})", topic.name, topic.id);
            println!("  {}", topic.description);
            println!("  Tier: {}  Difficulty: {}", topic.tier.as_str(), topic.difficulty);
            let prerequisites: Vec<&str> = graph
                .prerequisites_of(&topic.id)
                .into_iter()
                .map(|t| t.name.as_str())
                .collect();
            if !prerequisites.is_empty() {
                println!("  Prerequisites: {}", prerequisites.join(", "));
            }
            for objective in &topic.learning_objectives {
                println!("  - {}", objective);
            }
        }
        TopicsCommand::Search { keyword } => {
            let found = graph.search(&keyword);
            if found.is_empty() {
                println!("No topics match '{}'.", keyword);
            }
            for topic in found {
                println!("{:<28} {}", topic.id, topic.name);
            }
        }
    }
    Ok(())
}

/// Replay `qualities` against a fresh schedule, one snapshot per review.
pub fn replay_reviews(qualities: &[u8], start: DateTime<Utc>) -> Result<Vec<SpacedRepetitionSchedule>> {
    let mut schedule = SpacedRepetitionSchedule::new("cli", "review", start);
    let mut now = start;
    let mut snapshots = Vec::with_capacity(qualities.len());
    for &quality in qualities {
        schedule.review(quality, now)?;
        snapshots.push(schedule.clone());
        now = schedule.next_review_at;
    }
    Ok(snapshots)
}

pub fn handle_review(qualities: &[u8]) -> Result<()> {
    let snapshots = replay_reviews(qualities, Utc::now())?;
    println!("{:>3} {:>7} {:>9} {:>6}  next review", "q", "ease", "interval", "streak");
    for (quality, s) in qualities.iter().zip(&snapshots) {
        println!(
            "{:>3} {:>7.2} {:>8}d {:>6}  {}",
            quality,
            s.ease_factor,
            s.interval_days,
            s.success_count,
            s.next_review_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub fn read_outcomes(path: &Path) -> Result<Vec<PracticeOutcome>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read outcomes from {}", path.display()))?;
    serde_json::from_str(&raw).context("Outcomes file must be a JSON array of practice outcomes")
}

/// Feed outcomes through the background worker, then plan a session.
pub async fn handle_practice(
    settings: &Settings,
    outcomes_path: &Path,
    student: &str,
    strategy: &str,
    count: usize,
) -> Result<()> {
    let strategy = PracticeStrategy::parse(strategy)
        .with_context(|| format!("Unknown strategy '{}' (expected focused or interleaved)", strategy))?;
    let outcomes = read_outcomes(outcomes_path)?;

    let scheduler = Arc::new(
        PracticeScheduler::new(Arc::new(InMemoryPracticeStore::new()))
            .with_graph(load_graph()?)
            .with_settings(settings.scheduler.clone()),
    );

    let shutdown = CancellationToken::new();
    let (sender, handle) = OutcomeWorker::spawn(scheduler.clone(), shutdown.clone());
    for outcome in outcomes {
        sender.submit(outcome).await?;
    }
    shutdown.cancel();
    let stats = handle.await.context("Outcome worker panicked")?;
    info!(applied = stats.applied, failed = stats.failed, "Outcomes applied");

    let gaps = scheduler.detect_gaps(student).await?;
    if gaps.is_empty() {
        println!("No learning gaps for {}.", student);
        return Ok(());
    }
    println!("Learning gaps for {}:", student);
    for gap in &gaps {
        println!(
            "  {:<28} {:<8} priority {:.2}  ({})",
            gap.topic_id,
            gap.label.as_str(),
            gap.priority,
            gap.reasons.join(", ")
        );
    }

    let plan = scheduler.generate_session(student, strategy, count).await?;
    println!("\n{} practice ({} problems):", plan.strategy, plan.items.len());
    for (i, item) in plan.items.iter().enumerate() {
        println!("  {:>2}. {} [{}]", i + 1, item.topic_id, item.difficulty);
    }

    let due = scheduler.due_reviews(student, Utc::now()).await?;
    if !due.is_empty() {
        let topics: Vec<&str> = due.iter().map(|s| s.topic_id.as_str()).collect();
        println!("\nDue for review: {}", topics.join(", "));
    }
    Ok(())
}
