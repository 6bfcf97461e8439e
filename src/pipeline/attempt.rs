use super::prompts::PromptKind;

/// Fixed answer returned when no stage produces anything usable.
pub const NOT_FOUND: &str = "Answer not found in provided documents";

/// The bare abstention token both templates ask the model to emit.
pub const UNKNOWN: &str = "unknown";

/// One generation call's raw output and the template that produced it.
#[derive(Debug, Clone)]
pub struct AnswerAttempt {
    pub text: String,
    pub kind: PromptKind,
}

impl AnswerAttempt {
    pub fn new(text: impl Into<String>, kind: PromptKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// True when the model declined: `Unknown` or the not-found phrase.
    pub fn is_abstention(&self) -> bool {
        is_unknown(&self.text) || self.text.to_lowercase().contains(&NOT_FOUND.to_lowercase())
    }

    /// Non-blank and not `Unknown`.
    pub fn is_usable(&self) -> bool {
        is_usable(&self.text)
    }
}

pub fn is_unknown(text: &str) -> bool {
    text.trim().to_lowercase() == UNKNOWN
}

/// An answer is unusable when blank or `Unknown`.
pub fn is_usable(text: &str) -> bool {
    !text.trim().is_empty() && !is_unknown(text)
}
