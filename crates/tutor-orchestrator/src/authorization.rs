//! Operation-level permission checks.
//!
//! Operations are named `"{category}:{action}"`, e.g. `"practice:generate"`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use tutor_types::{IntentCategory, Persona};

/// Who is asking, as seen by the authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub persona: Persona,
    pub session_id: String,
}

/// Decides whether a caller may perform an operation.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_operation_allowed(&self, ctx: &AuthContext, operation: &str) -> bool;
}

/// Permits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn is_operation_allowed(&self, _ctx: &AuthContext, _operation: &str) -> bool {
        true
    }
}

/// Allows intent categories per persona; actions within a category are not
/// distinguished unless explicitly denied.
#[derive(Debug, Clone)]
pub struct PersonaPolicy {
    allowed: HashMap<Persona, HashSet<IntentCategory>>,
    denied_operations: HashSet<String>,
}

impl Default for PersonaPolicy {
    fn default() -> Self {
        use IntentCategory::*;

        let teaching = [Explain, Solve, Practice, Diagnose, Exam, Homework, Resources, General];
        let mut allowed = HashMap::new();
        allowed.insert(
            Persona::Student,
            teaching.iter().copied().chain([Progress, Scheduling]).collect(),
        );
        allowed.insert(
            Persona::Tutor,
            teaching.iter().copied().chain([Progress, Scheduling]).collect(),
        );
        allowed.insert(
            Persona::Client,
            [Explain, Progress, Resources, Scheduling, General].into_iter().collect(),
        );
        allowed.insert(Persona::Agent, IntentCategory::all().iter().copied().collect());

        Self {
            allowed,
            denied_operations: HashSet::new(),
        }
    }
}

impl PersonaPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: deny one exact operation regardless of persona
    pub fn deny(mut self, operation: impl Into<String>) -> Self {
        self.denied_operations.insert(operation.into());
        self
    }

    /// Builder: replace a persona's allowed categories
    pub fn with_categories(
        mut self,
        persona: Persona,
        categories: impl IntoIterator<Item = IntentCategory>,
    ) -> Self {
        self.allowed.insert(persona, categories.into_iter().collect());
        self
    }

    pub fn allows(&self, persona: Persona, operation: &str) -> bool {
        if self.denied_operations.contains(operation) {
            return false;
        }
        let category = operation.split(':').next().and_then(IntentCategory::parse);
        match (category, self.allowed.get(&persona)) {
            (Some(category), Some(allowed)) => allowed.contains(&category),
            _ => false,
        }
    }
}

#[async_trait]
impl Authorizer for PersonaPolicy {
    async fn is_operation_allowed(&self, ctx: &AuthContext, operation: &str) -> bool {
        self.allows(ctx.persona, operation)
    }
}
