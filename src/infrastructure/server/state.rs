use crate::agent::AgentFactory;
use crate::constants::DEFAULT_SESSION_IDLE_SECS;
use crate::session::{ConfigurationSource, SessionController};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

pub type SharedController = Arc<Mutex<SessionController>>;

struct SessionEntry {
    controller: SharedController,
    last_seen: StdMutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }
}

/// Registry of browser sessions, each with its own controller.
///
/// Sessions leave the registry when the page closes them, when they sit idle
/// longer than the idle timeout, or on shutdown. Each departure resets the
/// controller so its agent and tool servers are released.
pub struct AppState {
    factory: Arc<dyn AgentFactory>,
    source: Arc<dyn ConfigurationSource>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(factory: Arc<dyn AgentFactory>, source: Arc<dyn ConfigurationSource>) -> Self {
        Self {
            factory,
            source,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub(crate) fn source(&self) -> &dyn ConfigurationSource {
        self.source.as_ref()
    }

    pub(crate) async fn create_session(&self) -> (Uuid, SharedController) {
        let id = Uuid::new_v4();
        let controller = Arc::new(Mutex::new(SessionController::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.source),
        )));
        self.sessions.write().await.insert(
            id,
            SessionEntry {
                controller: Arc::clone(&controller),
                last_seen: StdMutex::new(Instant::now()),
            },
        );
        info!(session_id = %id, "Session created");
        (id, controller)
    }

    /// Looks a session up and marks it as recently used.
    pub(crate) async fn session(&self, id: &Uuid) -> Option<SharedController> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(id)?;
        entry.touch();
        Some(Arc::clone(&entry.controller))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Removes a session and resets it. Returns `false` for unknown ids.
    pub async fn close_session(&self, id: &Uuid) -> bool {
        let Some(entry) = self.sessions.write().await.remove(id) else {
            return false;
        };
        entry.controller.lock().await.reset().await;
        info!(session_id = %id, "Session closed");
        true
    }

    /// Closes every session idle for at least the idle timeout.
    ///
    /// Sessions whose controller is busy with an action are left alone.
    pub async fn evict_idle(&self) -> usize {
        let evicted: Vec<(Uuid, SharedController)> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| {
                    entry.idle_for() >= self.idle_timeout && entry.controller.try_lock().is_ok()
                })
                .map(|(id, _)| *id)
                .collect();
            expired
                .into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.controller)))
                .collect()
        };

        for (id, controller) in &evicted {
            controller.lock().await.reset().await;
            info!(session_id = %id, "Idle session evicted");
        }
        evicted.len()
    }

    /// Resets every session, releasing their tool servers.
    pub async fn shutdown(&self) {
        let controllers: Vec<SharedController> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry.controller)
            .collect();
        for controller in controllers {
            controller.lock().await.reset().await;
        }
    }
}

/// Periodically evicts idle sessions until the state is dropped.
pub fn spawn_idle_sweep(state: &Arc<AppState>) -> JoinHandle<()> {
    let period = (state.idle_timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    let state: Weak<AppState> = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            let evicted = state.evict_idle().await;
            if evicted > 0 {
                let remaining = state.session_count().await;
                debug!(evicted, remaining, "Idle sweep finished");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, QueryAgent};
    use crate::config::{Configuration, ServerDescriptor};
    use async_trait::async_trait;

    struct NoAgents;

    #[async_trait]
    impl AgentFactory for NoAgents {
        async fn build(&self, _configuration: Configuration) -> Result<Box<dyn QueryAgent>, AgentError> {
            Err(AgentError::InvalidResponse("no agents in this test".into()))
        }
    }

    fn configuration() -> Configuration {
        Configuration::new().with_server("graphiti", ServerDescriptor::event_stream("http://localhost:8000/sse"))
    }

    fn state(idle_timeout: Duration) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(NoAgents), Arc::new(configuration)).with_idle_timeout(idle_timeout))
    }

    #[tokio::test(start_paused = true)]
    async fn recently_used_sessions_survive_eviction() {
        let state = state(Duration::from_secs(60));
        let (stale, _) = state.create_session().await;
        tokio::time::advance(Duration::from_secs(45)).await;
        let (fresh, _) = state.create_session().await;
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(state.evict_idle().await, 1);
        assert!(state.session(&stale).await.is_none());
        assert!(state.session(&fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_keep_a_session_alive() {
        let state = state(Duration::from_secs(60));
        let (id, _) = state.create_session().await;
        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(state.session(&id).await.is_some());
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(state.evict_idle().await, 0);
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_sessions_are_not_evicted() {
        let state = state(Duration::from_secs(1));
        let (_, controller) = state.create_session().await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let guard = controller.lock().await;
        assert_eq!(state.evict_idle().await, 0);
        drop(guard);
        assert_eq!(state.evict_idle().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_task_evicts_abandoned_sessions() {
        let state = state(Duration::from_secs(8));
        state.create_session().await;
        let sweep = spawn_idle_sweep(&state);

        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(state.session_count().await, 0);
        sweep.abort();
    }

    #[tokio::test]
    async fn closing_an_unknown_session_is_reported() {
        let state = state(Duration::from_secs(60));
        assert!(!state.close_session(&Uuid::new_v4()).await);
    }
}
