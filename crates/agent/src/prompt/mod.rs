//! Prompt assembly — one completion-ready string per incoming message.
//!
//! # Sections (fixed order)
//!
//! | Section | Source | Omitted when |
//! |---------|--------|--------------|
//! | System | style template + persona | never |
//! | Instruction | fixed brevity line | never |
//! | Intent info | products / FAQ selected by intent | no matching intent or facts |
//! | Retrieved knowledge | embedding index, raw message | no hits fit the budget |
//! | History | last turns of the conversation | no history |
//! | Latest message | `User: ...` + `Assistant:` | never |
//!
//! Sections are joined by one blank line; an omitted section leaves no
//! separator behind.

pub mod assembler;
pub mod templates;
pub mod token;

pub use assembler::PromptAssembler;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    System,
    Instruction,
    IntentInfo,
    RetrievedKnowledge,
    History,
    LatestMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSection {
    pub kind: SectionKind,
    pub text: String,
}

/// The ordered sections of one request's prompt. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptContext {
    sections: Vec<PromptSection>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section. Blank text is dropped.
    pub fn push(&mut self, kind: SectionKind, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.sections.push(PromptSection { kind, text });
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.text.as_str())
    }

    /// The prompt text sent to the provider.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Character-heuristic token estimate of the rendered prompt.
    pub fn estimated_tokens(&self) -> usize {
        token::estimate_tokens(&self.render())
    }
}

impl std::fmt::Display for PromptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sections_leave_no_separator() {
        let mut ctx = PromptContext::new();
        ctx.push(SectionKind::System, "sys");
        ctx.push(SectionKind::IntentInfo, "  \n");
        ctx.push(SectionKind::LatestMessage, "User: hi\nAssistant:");
        assert_eq!(ctx.render(), "sys\n\nUser: hi\nAssistant:");
        assert_eq!(ctx.sections().len(), 2);
        assert!(ctx.section(SectionKind::IntentInfo).is_none());
    }

    #[test]
    fn estimate_covers_separators() {
        let mut ctx = PromptContext::new();
        ctx.push(SectionKind::System, "abcd");
        ctx.push(SectionKind::Instruction, "efgh");
        // "abcd\n\nefgh" is 10 chars
        assert_eq!(ctx.estimated_tokens(), 3);
    }
}
