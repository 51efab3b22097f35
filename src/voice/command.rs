//! Transcript classification
//!
//! A transcript either addresses the assistant (it contains the assistant
//! keyword as a whole word) or is text to type.

use regex::Regex;

/// What a transcript asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Nothing to do
    Empty,
    /// Type this text at the current focus
    Type(String),
    /// Ask the assistant this question
    Assistant(String),
}

/// Parses transcripts into [`VoiceCommand`]s
#[derive(Debug, Clone)]
pub struct CommandParser {
    keyword: Regex,
    assistant_prefix: Regex,
    type_prefix: Regex,
    annotation: Regex,
}

impl CommandParser {
    /// Build a parser for the given assistant keyword (e.g. "ai")
    pub fn new(keyword: &str) -> Result<Self, regex::Error> {
        let kw = regex::escape(keyword.trim());
        Ok(Self {
            keyword: Regex::new(&format!(r"(?i)\b{}\b", kw))?,
            // "ai ...", "ai: ...", "ask ai ...", "ask the ai: ..."
            assistant_prefix: Regex::new(&format!(
                r"(?i)^(?:ask\s+(?:the\s+)?)?{}\b\s*[:,]*\s*",
                kw
            ))?,
            type_prefix: Regex::new(r"(?i)^type\s+")?,
            // Non-speech markers such as [BLANK_AUDIO] or (music)
            annotation: Regex::new(r"\[[^\]]*\]|\([^)]*\)")?,
        })
    }

    pub fn parse(&self, transcript: &str) -> VoiceCommand {
        let cleaned = self.annotation.replace_all(transcript, "");
        let text = cleaned.trim();
        if text.is_empty() {
            return VoiceCommand::Empty;
        }

        if self.keyword.is_match(text) {
            let query = self.assistant_prefix.replace(text, "");
            let query = query.trim_matches(|c: char| c.is_whitespace() || ".,:;!?".contains(c));
            if query.is_empty() {
                return VoiceCommand::Empty;
            }
            return VoiceCommand::Assistant(query.to_string());
        }

        let typed = self.type_prefix.replace(text, "");
        let typed = typed.trim();
        if typed.is_empty() {
            VoiceCommand::Empty
        } else {
            VoiceCommand::Type(typed.to_string())
        }
    }
}
