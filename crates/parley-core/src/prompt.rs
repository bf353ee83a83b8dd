//! Prompt assembly
//!
//! Turns a session plus one inbound text into a [`CompletionRequest`]. The
//! user turn is appended to history before anything else, so it survives a
//! later failure. The system turn is synthesized per request and never stored.

use crate::config::SessionConfig;
use crate::session::Session;
use crate::truncate::truncate_history;
use parley_llm::{CompletionRequest, Message};
use tracing::debug;

/// Builds completion requests from session state
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    history_budget: usize,
    default_persona: String,
}

impl PromptAssembler {
    /// Create an assembler from session configuration
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            history_budget: config.history_budget(),
            default_persona: config.default_persona.clone(),
        }
    }

    /// Token budget for stored history
    #[must_use]
    pub fn history_budget(&self) -> usize {
        self.history_budget
    }

    /// Record `inbound` and build the request for it
    pub fn build_request(&self, session: &mut Session, inbound: &str) -> CompletionRequest {
        session.push_user(inbound);
        truncate_history(session.history_mut(), self.history_budget);
        self.request_for(session)
    }

    /// Request for the session as it stands, without mutating it
    #[must_use]
    pub fn request_for(&self, session: &Session) -> CompletionRequest {
        let settings = session.settings();
        let system = Message::system(session.context_or(&self.default_persona));

        debug!(
            user_id = %session.user_id(),
            model = %settings.model,
            turns = session.history().len(),
            "Assembled completion request"
        );

        CompletionRequest::new(settings.model.clone())
            .with_message(system)
            .with_messages(session.history().iter().cloned())
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_top_p(1.0)
            .with_penalties(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PERSONA;
    use crate::session::UserId;
    use crate::settings::UserSettings;
    use parley_llm::MessageRole;

    fn session() -> Session {
        Session::new(UserId(1), UserSettings::default())
    }

    #[test]
    fn test_first_message_request() {
        let assembler = PromptAssembler::new(&SessionConfig::default());
        let mut session = session();

        let request = assembler.build_request(&mut session, "Hello");

        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(
            request.messages,
            vec![Message::system(DEFAULT_PERSONA), Message::user("Hello")]
        );
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1500));
        assert_eq!(request.top_p, Some(1.0));
        assert_eq!(request.frequency_penalty, Some(0.0));
        assert_eq!(request.presence_penalty, Some(0.0));
        assert_eq!(session.history(), &[Message::user("Hello")]);
    }

    #[test]
    fn test_custom_context_becomes_system_turn() {
        let assembler = PromptAssembler::new(&SessionConfig::default());
        let mut session = session();
        session.set_custom_context("You are a pirate");

        let request = assembler.build_request(&mut session, "hi");

        assert_eq!(request.messages[0], Message::system("You are a pirate"));
        assert!(session
            .history()
            .iter()
            .all(|m| m.role != MessageRole::System));
    }

    #[test]
    fn test_history_truncated_to_budget() {
        let config = SessionConfig {
            context_window: 10,
            reserved_response_tokens: 6,
            ..Default::default()
        };
        let assembler = PromptAssembler::new(&config);
        let mut session = session();
        session.push_user("a b c");
        session.push_assistant("d e");

        let request = assembler.build_request(&mut session, "f");

        assert_eq!(
            session.history(),
            &[Message::assistant("d e"), Message::user("f")]
        );
        assert_eq!(request.messages.len(), 3);
    }

    #[test]
    fn test_budget_ignores_user_max_tokens() {
        let assembler = PromptAssembler::new(&SessionConfig::default());
        let mut session = session();
        session.settings_mut().max_tokens = 1;
        session.push_user("one two three");

        assembler.build_request(&mut session, "four");

        assert_eq!(session.history().len(), 2);
        assert_eq!(assembler.history_budget(), 2596);
    }

    #[test]
    fn test_deterministic() {
        let assembler = PromptAssembler::new(&SessionConfig::default());
        let mut session = session();
        session.push_user("x");
        session.push_assistant("y");

        assert_eq!(assembler.request_for(&session), assembler.request_for(&session));
    }

    #[test]
    fn test_uses_user_settings() {
        let assembler = PromptAssembler::new(&SessionConfig::default());
        let mut session = session();
        session.settings_mut().model = "gpt-4".to_string();
        session.settings_mut().temperature = 0.2;
        session.settings_mut().max_tokens = 300;

        let request = assembler.build_request(&mut session, "q");

        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(300));
    }
}
