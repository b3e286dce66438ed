use super::error::ActivationError;
use super::notice::Notice;
use super::outcome::{QueryOutcome, SubmitOutcome};
use super::state::{ActiveAgent, Session, SessionState};
use crate::application::agent::AgentFactory;
use crate::config::{Configuration, build_configuration};
use crate::types::ChatMessage;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

pub const ACTIVATED_MESSAGE: &str = "Configuration activated.";
pub const NOT_ACTIVATED_MESSAGE: &str = "Please activate the configuration first.";
pub const RESET_MESSAGE: &str = "Chat and configuration cleared.";

/// Where activation obtains its configuration from.
pub trait ConfigurationSource: Send + Sync {
    fn load(&self) -> Configuration;
}

impl<F> ConfigurationSource for F
where
    F: Fn() -> Configuration + Send + Sync,
{
    fn load(&self) -> Configuration {
        self()
    }
}

/// Reads the tool-server configuration from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigurationSource;

impl ConfigurationSource for EnvConfigurationSource {
    fn load(&self) -> Configuration {
        build_configuration()
    }
}

/// Point-in-time view of a session for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Active configuration with secrets masked; absent while idle.
    #[schema(value_type = Option<Object>)]
    pub configuration: Option<Value>,
    pub transcript: Vec<ChatMessage>,
}

/// Drives one [`Session`] through Activate, Submit-Query and Reset.
///
/// Every operation leaves the session in a consistent state and reports
/// problems as notices or failed outcomes instead of errors.
pub struct SessionController {
    session: Session,
    factory: Arc<dyn AgentFactory>,
    source: Arc<dyn ConfigurationSource>,
}

impl SessionController {
    pub fn new(factory: Arc<dyn AgentFactory>, source: Arc<dyn ConfigurationSource>) -> Self {
        Self {
            session: Session::new(),
            factory,
            source,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.session.transcript()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.session.state(),
            configuration: self
                .session
                .configuration()
                .map(|configuration| configuration.redacted().to_json()),
            transcript: self.session.transcript().to_vec(),
        }
    }

    pub async fn activate(&mut self) -> Notice {
        self.release_agent().await;

        match self.try_activate().await {
            Ok(servers) => {
                info!(servers, "Session activated");
                Notice::success(ACTIVATED_MESSAGE)
            }
            Err(err) => {
                error!(%err, "Activation failed");
                Notice::error(err.user_message())
            }
        }
    }

    async fn try_activate(&mut self) -> Result<usize, ActivationError> {
        let configuration = self.source.load();
        if configuration.is_empty() {
            return Err(ActivationError::EmptyConfiguration);
        }
        let servers = configuration.len();
        let agent = self.factory.build(configuration.clone()).await?;
        self.session.install(ActiveAgent {
            agent,
            configuration,
        });
        Ok(servers)
    }

    pub async fn submit_query(&mut self, text: &str) -> SubmitOutcome {
        let Some(agent) = self.session.begin_turn(text) else {
            warn!("Query submitted before activation");
            return SubmitOutcome::Rejected(Notice::warning(NOT_ACTIVATED_MESSAGE));
        };

        let outcome = match agent.run(text).await {
            Ok(result) => QueryOutcome::Answered(result.response),
            Err(err) => {
                error!(%err, "Agent run failed");
                QueryOutcome::Failed(err.user_message())
            }
        };

        self.session.push(ChatMessage::assistant(outcome.render()));
        SubmitOutcome::Completed(outcome)
    }

    pub async fn reset(&mut self) -> Notice {
        self.release_agent().await;
        self.session.clear_transcript();
        info!("Session reset");
        Notice::info(RESET_MESSAGE)
    }

    async fn release_agent(&mut self) {
        if let Some(active) = self.session.take_agent() {
            active.agent.shutdown().await;
        }
    }
}
