//! Teaching mode selection.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. explain or general intent: Direct
//! 2. solve or practice intent with struggle below 0.6: Socratic
//! 3. struggle above 0.8, or more than 3 questions asked: Direct
//! 4. diagnose intent: Supportive
//! 5. exam or homework intent: Adaptive
//! 6. tutor or client persona: Direct
//! 7. otherwise: Adaptive

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use tutor_types::{IntentCategory, Persona};

/// Struggle estimate before any signals are counted.
pub const BASELINE_STRUGGLE: f32 = 0.5;

const STRUGGLE_STEP: f32 = 0.15;
const CONFIDENCE_STEP: f32 = 0.10;

static STRUGGLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bdon[’']?t (?:understand|get it)\b",
        r"\bstuck\b",
        r"\bconfus(?:ed|ing)\b",
        r"\bno idea\b",
        r"\blost\b",
        r"\bhelp me\b",
        r"\bcan[’']?t (?:do|solve|figure)\b",
        r"\bgive up\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static CONFIDENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bi think i (?:get|got)\b",
        r"\bmakes sense\b",
        r"\bgot it\b",
        r"\bi understand\b",
        r"\beasy\b",
        r"\bthat[’']?s clear\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// How the tutor should pitch its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingMode {
    /// Guide with questions rather than answers
    Socratic,
    /// Explain clearly and show worked steps
    Direct,
    /// Mix guidance and explanation based on responses
    Adaptive,
    /// Encourage first, then correct gently
    Supportive,
}

impl TeachingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeachingMode::Socratic => "socratic",
            TeachingMode::Direct => "direct",
            TeachingMode::Adaptive => "adaptive",
            TeachingMode::Supportive => "supportive",
        }
    }

    /// Instruction fragment appended to the system prompt.
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TeachingMode::Socratic => {
                "Teaching mode: Socratic. Do not give the final answer. Ask one guiding \
                 question at a time and let the learner take each step."
            }
            TeachingMode::Direct => {
                "Teaching mode: Direct. Explain the idea clearly, show a worked example \
                 step by step, then check understanding with one short question."
            }
            TeachingMode::Adaptive => {
                "Teaching mode: Adaptive. Start with a hint; if the learner is still unsure, \
                 move to a worked explanation."
            }
            TeachingMode::Supportive => {
                "Teaching mode: Supportive. Acknowledge what the learner did well, locate the \
                 error kindly, and rebuild confidence before correcting."
            }
        }
    }
}

impl std::fmt::Display for TeachingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs to mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeContext {
    pub intent: IntentCategory,
    /// Estimated struggle, 0.0-1.0
    pub struggle: f32,
    /// Questions the learner has asked so far in the session
    pub questions_asked: usize,
    pub persona: Persona,
}

/// Selected mode with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRecommendation {
    pub mode: TeachingMode,
    pub confidence: f32,
    pub reason: String,
    /// Mode to switch to if this one is not landing
    pub fallback: TeachingMode,
}

impl ModeRecommendation {
    fn new(mode: TeachingMode, confidence: f32, reason: impl Into<String>, fallback: TeachingMode) -> Self {
        Self {
            mode,
            confidence,
            reason: reason.into(),
            fallback,
        }
    }
}

/// Pick a teaching mode. Deterministic for identical contexts.
pub fn select_mode(ctx: &ModeContext) -> ModeRecommendation {
    use IntentCategory::*;

    match ctx.intent {
        Explain | General => {
            return ModeRecommendation::new(
                TeachingMode::Direct,
                0.9,
                "Concept questions are best answered with a clear explanation",
                TeachingMode::Adaptive,
            )
        }
        Solve | Practice if ctx.struggle < 0.6 => {
            return ModeRecommendation::new(
                TeachingMode::Socratic,
                0.85,
                format!(
                    "Learner is coping (struggle {:.2}); guide them to solve it themselves",
                    ctx.struggle
                ),
                TeachingMode::Direct,
            )
        }
        _ => {}
    }

    if ctx.struggle > 0.8 || ctx.questions_asked > 3 {
        return ModeRecommendation::new(
            TeachingMode::Direct,
            0.8,
            format!(
                "Learner is struggling (struggle {:.2}, {} questions asked); show the method",
                ctx.struggle, ctx.questions_asked
            ),
            TeachingMode::Supportive,
        );
    }

    match ctx.intent {
        Diagnose => ModeRecommendation::new(
            TeachingMode::Supportive,
            0.85,
            "Reviewing a mistake calls for encouragement alongside correction",
            TeachingMode::Direct,
        ),
        Exam | Homework => ModeRecommendation::new(
            TeachingMode::Adaptive,
            0.75,
            "Assessed work needs a balance of hints and explanation",
            TeachingMode::Socratic,
        ),
        _ if matches!(ctx.persona, Persona::Tutor | Persona::Client) => ModeRecommendation::new(
            TeachingMode::Direct,
            0.7,
            format!("{} callers want straightforward answers", ctx.persona),
            TeachingMode::Adaptive,
        ),
        _ => ModeRecommendation::new(
            TeachingMode::Adaptive,
            0.5,
            "No strong signal; adapt to the learner's responses",
            TeachingMode::Direct,
        ),
    }
}

/// Estimate struggle from learner text, clamped to 0.0-1.0.
pub fn estimate_struggle<'a>(messages: impl IntoIterator<Item = &'a str>) -> f32 {
    let mut struggle = BASELINE_STRUGGLE;
    for message in messages {
        let lower = message.to_lowercase();
        let hits = STRUGGLE_PATTERNS.iter().filter(|p| p.is_match(&lower)).count();
        let reassurances = CONFIDENCE_PATTERNS.iter().filter(|p| p.is_match(&lower)).count();
        struggle += STRUGGLE_STEP * hits as f32 - CONFIDENCE_STEP * reassurances as f32;
    }
    struggle.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(intent: IntentCategory, struggle: f32, questions_asked: usize, persona: Persona) -> ModeContext {
        ModeContext {
            intent,
            struggle,
            questions_asked,
            persona,
        }
    }

    #[test]
    fn test_explain_is_direct() {
        let rec = select_mode(&ctx(IntentCategory::Explain, 0.1, 0, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Direct);
        assert_eq!(rec.fallback, TeachingMode::Adaptive);
        // Rule 1 wins even when rule 3 would also match
        let rec = select_mode(&ctx(IntentCategory::General, 0.95, 10, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Direct);
        assert_eq!(rec.confidence, 0.9);
    }

    #[test]
    fn test_solve_depends_on_struggle() {
        let rec = select_mode(&ctx(IntentCategory::Solve, 0.5, 0, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Socratic);

        let rec = select_mode(&ctx(IntentCategory::Practice, 0.9, 0, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Direct);
        assert_eq!(rec.fallback, TeachingMode::Supportive);

        // 0.6 is not below the Socratic threshold, nor above the Direct one
        let rec = select_mode(&ctx(IntentCategory::Solve, 0.6, 0, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Adaptive);
    }

    #[test]
    fn test_many_questions_is_direct() {
        let rec = select_mode(&ctx(IntentCategory::Diagnose, 0.5, 4, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Direct);
        let rec = select_mode(&ctx(IntentCategory::Diagnose, 0.5, 3, Persona::Student));
        assert_eq!(rec.mode, TeachingMode::Supportive);
    }

    #[test]
    fn test_assessed_work_is_adaptive() {
        for intent in [IntentCategory::Exam, IntentCategory::Homework] {
            let rec = select_mode(&ctx(intent, 0.5, 0, Persona::Tutor));
            assert_eq!(rec.mode, TeachingMode::Adaptive);
        }
    }

    #[test]
    fn test_persona_and_default() {
        let rec = select_mode(&ctx(IntentCategory::Scheduling, 0.5, 0, Persona::Client));
        assert_eq!(rec.mode, TeachingMode::Direct);
        assert!(rec.reason.starts_with("client"));

        let rec = select_mode(&ctx(IntentCategory::Scheduling, 0.5, 0, Persona::Agent));
        assert_eq!(rec.mode, TeachingMode::Adaptive);
        assert_eq!(rec.confidence, 0.5);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let c = ctx(IntentCategory::Progress, 0.7, 2, Persona::Student);
        assert_eq!(select_mode(&c), select_mode(&c));
    }

    #[test]
    fn test_struggle_estimate() {
        assert_eq!(estimate_struggle(Vec::<&str>::new()), BASELINE_STRUGGLE);

        let s = estimate_struggle(["I'm stuck and confused, I don't understand"]);
        assert!((s - 0.95).abs() < 1e-5);

        let s = estimate_struggle(["Got it, that makes sense"]);
        assert!((s - 0.3).abs() < 1e-5);

        let s = estimate_struggle(["stuck", "lost", "no idea", "help me"]);
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_mode_prompt_fragments() {
        assert!(TeachingMode::Socratic.prompt_instruction().contains("Do not give the final answer"));
        assert_eq!(TeachingMode::Supportive.to_string(), "supportive");
    }
}
