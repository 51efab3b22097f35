//! Acting on voice results

use super::command::{CommandParser, VoiceCommand};
use super::mailbox::VoiceOutcome;
use crate::assistant::{Assistant, ScreenCapture};
use crate::injection::InputSink;

/// What dispatching a voice result did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Empty transcript or bare keyword
    Ignored,
    /// Capture or transcription failed
    Failed(String),
    /// Text was typed
    Typed(String),
    /// The assistant answered and the answer was typed
    Answered { query: String, answer: String },
    /// The assistant could not answer; nothing was typed
    AssistantFailed { query: String, error: String },
}

/// Routes transcripts to typing or the assistant
pub struct VoiceDispatcher {
    parser: CommandParser,
    assistant: Option<Box<dyn Assistant>>,
    screen: Box<dyn ScreenCapture>,
}

impl VoiceDispatcher {
    pub fn new(
        parser: CommandParser,
        assistant: Option<Box<dyn Assistant>>,
        screen: Box<dyn ScreenCapture>,
    ) -> Self {
        Self {
            parser,
            assistant,
            screen,
        }
    }

    pub fn dispatch(&self, outcome: VoiceOutcome, sink: &dyn InputSink) -> DispatchResult {
        let transcript = match outcome {
            VoiceOutcome::Failed(error) => {
                tracing::error!("Voice capture failed: {}", error);
                return DispatchResult::Failed(error);
            }
            VoiceOutcome::Transcript(t) => t,
        };

        match self.parser.parse(&transcript) {
            VoiceCommand::Empty => {
                tracing::debug!("Empty voice command ignored: {:?}", transcript);
                DispatchResult::Ignored
            }
            VoiceCommand::Type(text) => {
                tracing::info!("Typing voice transcript ({} chars)", text.chars().count());
                sink.type_text(&text);
                DispatchResult::Typed(text)
            }
            VoiceCommand::Assistant(query) => self.ask(query, sink),
        }
    }

    fn ask(&self, query: String, sink: &dyn InputSink) -> DispatchResult {
        let Some(assistant) = &self.assistant else {
            tracing::warn!("Assistant query dropped, no assistant configured: {:?}", query);
            return DispatchResult::AssistantFailed {
                query,
                error: "no assistant configured".to_string(),
            };
        };

        let screenshot = match self.screen.capture() {
            Ok(shot) => Some(shot),
            Err(e) => {
                tracing::warn!("Screen capture failed, asking without image: {}", e);
                None
            }
        };

        tracing::info!("Asking assistant: {:?}", query);
        match assistant.query(&query, screenshot.as_ref()) {
            Ok(answer) => {
                sink.type_text(&answer);
                DispatchResult::Answered { query, answer }
            }
            Err(e) => {
                tracing::error!("Assistant query failed: {}", e);
                DispatchResult::AssistantFailed {
                    query,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{AssistantError, NoScreenCapture, Screenshot};
    use crate::injection::MouseButton;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct TypedText(Mutex<Vec<String>>);

    impl InputSink for TypedText {
        fn move_relative(&self, _dx: i32, _dy: i32) {}
        fn click(&self, _button: MouseButton, _at: Option<(i32, i32)>) {}
        fn type_text(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }
    }

    /// Records queries and whether a screenshot came along
    struct EchoAssistant {
        seen: Arc<Mutex<Vec<(String, bool)>>>,
        fail: bool,
    }

    impl Assistant for EchoAssistant {
        fn query(
            &self,
            text: &str,
            screenshot: Option<&Screenshot>,
        ) -> Result<String, AssistantError> {
            self.seen.lock().push((text.to_string(), screenshot.is_some()));
            if self.fail {
                Err(AssistantError::Unavailable("offline".into()))
            } else {
                Ok(format!("answer to {}", text))
            }
        }
    }

    struct FakeScreen;

    impl ScreenCapture for FakeScreen {
        fn capture(&self) -> anyhow::Result<Screenshot> {
            Ok(Screenshot {
                png: vec![1, 2, 3],
                width: 1,
                height: 1,
            })
        }
    }

    fn dispatcher(
        fail: bool,
        screen: Box<dyn ScreenCapture>,
    ) -> (VoiceDispatcher, Arc<Mutex<Vec<(String, bool)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let assistant = EchoAssistant {
            seen: Arc::clone(&seen),
            fail,
        };
        let d = VoiceDispatcher::new(
            CommandParser::new("ai").unwrap(),
            Some(Box::new(assistant)),
            screen,
        );
        (d, seen)
    }

    #[test]
    fn test_type_command() {
        let (d, seen) = dispatcher(false, Box::new(FakeScreen));
        let sink = TypedText::default();
        let result = d.dispatch(VoiceOutcome::Transcript("type hello".into()), &sink);
        assert_eq!(result, DispatchResult::Typed("hello".into()));
        assert_eq!(*sink.0.lock(), vec!["hello".to_string()]);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_assistant_answer_is_typed() {
        let (d, seen) = dispatcher(false, Box::new(FakeScreen));
        let sink = TypedText::default();
        let result = d.dispatch(
            VoiceOutcome::Transcript("ask the AI: what is this".into()),
            &sink,
        );
        assert_eq!(
            result,
            DispatchResult::Answered {
                query: "what is this".into(),
                answer: "answer to what is this".into()
            }
        );
        assert_eq!(*seen.lock(), vec![("what is this".to_string(), true)]);
        assert_eq!(*sink.0.lock(), vec!["answer to what is this".to_string()]);
    }

    #[test]
    fn test_capture_failure_asks_without_image() {
        let (d, seen) = dispatcher(false, Box::new(NoScreenCapture));
        let sink = TypedText::default();
        d.dispatch(VoiceOutcome::Transcript("ai what time is it".into()), &sink);
        assert_eq!(*seen.lock(), vec![("what time is it".to_string(), false)]);
    }

    #[test]
    fn test_assistant_failure_types_nothing() {
        let (d, _) = dispatcher(true, Box::new(FakeScreen));
        let sink = TypedText::default();
        let result = d.dispatch(VoiceOutcome::Transcript("ai hello".into()), &sink);
        assert!(matches!(result, DispatchResult::AssistantFailed { .. }));
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn test_failed_and_empty_outcomes() {
        let (d, seen) = dispatcher(false, Box::new(FakeScreen));
        let sink = TypedText::default();
        assert_eq!(
            d.dispatch(VoiceOutcome::Failed("mic".into()), &sink),
            DispatchResult::Failed("mic".into())
        );
        assert_eq!(
            d.dispatch(VoiceOutcome::Transcript("  ".into()), &sink),
            DispatchResult::Ignored
        );
        assert_eq!(
            d.dispatch(VoiceOutcome::Transcript("AI".into()), &sink),
            DispatchResult::Ignored
        );
        assert!(sink.0.lock().is_empty());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_no_assistant_configured() {
        let d = VoiceDispatcher::new(
            CommandParser::new("ai").unwrap(),
            None,
            Box::new(NoScreenCapture),
        );
        let sink = TypedText::default();
        let result = d.dispatch(VoiceOutcome::Transcript("ai hi".into()), &sink);
        assert!(matches!(result, DispatchResult::AssistantFailed { .. }));
    }
}
