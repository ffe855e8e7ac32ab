//! Caller personas.

use serde::{Deserialize, Serialize};

/// The caller's role.
///
/// Drives tone, tool access, knowledge sources and fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// A learner
    #[default]
    Student,
    /// A tutor preparing or running lessons
    Tutor,
    /// A parent or client booking tutoring
    Client,
    /// An agency administrator
    Agent,
}

impl Persona {
    /// Returns the display name for this persona.
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Student => "student",
            Persona::Tutor => "tutor",
            Persona::Client => "client",
            Persona::Agent => "agent",
        }
    }

    /// Parse from a display name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "student" => Some(Persona::Student),
            "tutor" => Some(Persona::Tutor),
            "client" => Some(Persona::Client),
            "agent" => Some(Persona::Agent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for persona in [Persona::Student, Persona::Tutor, Persona::Client, Persona::Agent] {
            assert_eq!(Persona::parse(persona.as_str()), Some(persona));
        }
        assert_eq!(Persona::parse(" Tutor "), Some(Persona::Tutor));
        assert_eq!(Persona::parse("admin"), None);
    }

    #[test]
    fn test_default_is_student() {
        assert_eq!(Persona::default(), Persona::Student);
    }
}
