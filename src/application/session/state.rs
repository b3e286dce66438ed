use crate::application::agent::QueryAgent;
use crate::config::Configuration;
use crate::types::ChatMessage;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
}

pub(super) struct ActiveAgent {
    pub agent: Box<dyn QueryAgent>,
    pub configuration: Configuration,
}

/// Per-user conversation state.
///
/// The session is active exactly when it holds an agent.
#[derive(Default)]
pub struct Session {
    transcript: Vec<ChatMessage>,
    active: Option<ActiveAgent>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match self.active {
            Some(_) => SessionState::Active,
            None => SessionState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.active.as_ref().map(|active| &active.configuration)
    }

    /// Records the user turn and hands back the agent that must answer it.
    ///
    /// Returns `None`, leaving the transcript untouched, while idle.
    pub(super) fn begin_turn(&mut self, text: &str) -> Option<&dyn QueryAgent> {
        let active = self.active.as_ref()?;
        self.transcript.push(ChatMessage::user(text));
        Some(active.agent.as_ref())
    }

    pub(super) fn install(&mut self, active: ActiveAgent) {
        self.active = Some(active);
    }

    pub(super) fn take_agent(&mut self) -> Option<ActiveAgent> {
        self.active.take()
    }

    pub(super) fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub(super) fn clear_transcript(&mut self) {
        self.transcript.clear();
    }
}
