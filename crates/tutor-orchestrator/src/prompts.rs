//! Persona wording: system prompts, degraded replies, suggestions.

use tutor_types::Persona;

use crate::mode::TeachingMode;

/// Reply when authorization denies the requested operation.
pub const REFUSAL_MESSAGE: &str =
    "Sorry, that isn't something I can help with from this account. \
     Please contact your tutor or agency if you think you should have access.";

fn persona_preamble(persona: Persona) -> &'static str {
    match persona {
        Persona::Student => {
            "You are a patient, encouraging tutor helping a student learn. Keep explanations \
             at the learner's level, use short steps, and never just hand over answers to \
             assessed work."
        }
        Persona::Tutor => {
            "You are a teaching assistant supporting a professional tutor. Be concise and \
             practical: lesson ideas, worked solutions, common misconceptions and ways to \
             check understanding."
        }
        Persona::Client => {
            "You are a friendly assistant for a parent or client of a tutoring service. \
             Explain progress and topics in plain language without jargon."
        }
        Persona::Agent => {
            "You are an operations assistant for a tutoring agency. Be brief and factual."
        }
    }
}

/// Build the system prompt for a turn.
pub fn system_prompt(
    persona: Persona,
    mode: TeachingMode,
    subject: Option<&str>,
    level: Option<&str>,
    goal: Option<&str>,
) -> String {
    let mut prompt = String::from(persona_preamble(persona));

    match (subject, level) {
        (Some(subject), Some(level)) => {
            prompt.push_str(&format!("\n\nSubject: {} ({}).", subject, level))
        }
        (Some(subject), None) => prompt.push_str(&format!("\n\nSubject: {}.", subject)),
        (None, Some(level)) => prompt.push_str(&format!("\n\nLevel: {}.", level)),
        (None, None) => {}
    }
    if let Some(goal) = goal {
        prompt.push_str(&format!("\nSession goal: {}.", goal));
    }

    prompt.push_str("\n\n");
    prompt.push_str(mode.prompt_instruction());
    prompt
}

/// Static reply used when every provider has failed.
pub fn fallback_response(persona: Persona) -> &'static str {
    match persona {
        Persona::Student => {
            "I'm having trouble connecting right now, but let's keep going. Try breaking the \
             problem into smaller steps and write down what you already know. Send your \
             working and I'll check it as soon as I can."
        }
        Persona::Tutor => {
            "The assistant is temporarily unavailable. Your message has been saved to the \
             session; please try again in a moment."
        }
        Persona::Client => {
            "Sorry, I can't answer right now. Please try again shortly, or contact your \
             tutor directly if it's urgent."
        }
        Persona::Agent => "Assistant unavailable: all completion providers failed. Retry shortly.",
    }
}

/// Follow-up suggestions when the provider offers none.
pub fn default_suggestions(persona: Persona) -> Vec<String> {
    let suggestions: &[&str] = match persona {
        Persona::Student => &[
            "Explain this another way",
            "Give me a practice question",
            "Show me a worked example",
        ],
        Persona::Tutor => &[
            "Suggest a lesson activity",
            "List common misconceptions",
            "Generate practice questions",
        ],
        Persona::Client => &["How is my child progressing?", "Book a lesson"],
        Persona::Agent => &["Show active sessions", "Review tutor availability"],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}
