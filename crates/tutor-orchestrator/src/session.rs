//! Tutoring sessions and their registry.
//!
//! Sessions live in a [`DashMap`] keyed by ULID. Expiry is enforced lazily:
//! a lookup that finds an expired session removes it and reports it as not
//! found. Hosts may also sweep with [`SessionRegistry::purge_expired`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tutor_types::{ChatMessage, Persona, TutorError};

/// Lifecycle state. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Ended,
}

/// A tutoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub persona: Persona,
    pub subject: Option<String>,
    pub level: Option<String>,
    pub goal: Option<String>,
    /// Append-only history
    pub messages: Vec<ChatMessage>,
    /// Curriculum topic ids discussed so far; only ever grows
    pub topics_covered: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && !self.is_expired(now)
    }

    /// Learner messages, oldest first.
    pub fn user_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.is_user())
    }

    /// Learner messages that ask a question.
    pub fn questions_asked(&self) -> usize {
        self.user_messages().filter(|m| m.content.contains('?')).count()
    }
}

/// Parameters for a new session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    pub user_id: String,
    pub persona: Persona,
    pub subject: Option<String>,
    pub level: Option<String>,
    pub goal: Option<String>,
}

impl SessionStart {
    pub fn new(user_id: impl Into<String>, persona: Persona) -> Self {
        Self {
            user_id: user_id.into(),
            persona,
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }
}

/// Concurrent session store.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create and register a session.
    pub fn start(&self, start: SessionStart) -> Session {
        self.start_at(start, Utc::now())
    }

    pub fn start_at(&self, start: SessionStart, now: DateTime<Utc>) -> Session {
        let session = Session {
            session_id: ulid::Ulid::new().to_string(),
            user_id: start.user_id,
            persona: start.persona,
            subject: start.subject,
            level: start.level,
            goal: start.goal,
            messages: Vec::new(),
            topics_covered: BTreeSet::new(),
            started_at: now,
            expires_at: now + self.ttl,
            state: SessionState::Active,
        };

        info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            persona = session.persona.as_str(),
            "Session started"
        );
        self.sessions
            .insert(session.session_id.clone(), session.clone());
        session
    }

    /// Snapshot of an active session.
    pub fn get(&self, session_id: &str) -> Result<Session, TutorError> {
        self.get_at(session_id, Utc::now())
    }

    pub fn get_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<Session, TutorError> {
        if let Some(session) = self.sessions.get(session_id) {
            if session.is_active(now) {
                return Ok(session.value().clone());
            }
        }
        self.evict_if_inactive(session_id, now);
        Err(TutorError::SessionNotFound(session_id.to_string()))
    }

    /// End a session and remove it. Returns the final state.
    pub fn end(&self, session_id: &str) -> Result<Session, TutorError> {
        let now = Utc::now();
        match self.sessions.remove(session_id) {
            Some((_, mut session)) if session.is_active(now) => {
                session.state = SessionState::Ended;
                info!(
                    session_id = %session_id,
                    messages = session.messages.len(),
                    "Session ended"
                );
                Ok(session)
            }
            _ => Err(TutorError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Append a message to an active session.
    pub fn append(&self, session_id: &str, message: ChatMessage) -> Result<(), TutorError> {
        self.with_active(session_id, |session| session.messages.push(message))
    }

    /// Record topics as covered.
    pub fn add_topics(
        &self,
        session_id: &str,
        topics: impl IntoIterator<Item = String>,
    ) -> Result<(), TutorError> {
        self.with_active(session_id, |session| session.topics_covered.extend(topics))
    }

    /// Remove every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            info!(purged = purged, "Purged expired sessions");
        }
        purged
    }

    /// Sessions that are active right now.
    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.sessions.iter().filter(|s| s.is_active(now)).count()
    }

    fn with_active(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session),
    ) -> Result<(), TutorError> {
        let now = Utc::now();
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            if session.is_active(now) {
                f(&mut *session);
                return Ok(());
            }
        }
        self.evict_if_inactive(session_id, now);
        Err(TutorError::SessionNotFound(session_id.to_string()))
    }

    fn evict_if_inactive(&self, session_id: &str, now: DateTime<Utc>) {
        if self
            .sessions
            .remove_if(session_id, |_, s| !s.is_active(now))
            .is_some()
        {
            debug!(session_id = %session_id, "Evicted expired session");
        }
    }
}
