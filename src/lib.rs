pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, session, stdio, tooling};
pub use cli::{Cli, RunMode};
pub use config::{AppSettings, Configuration};
pub use domain::types;
pub use infrastructure::{model, server};

use agent::{AgentFactory, OpenAIAgentFactory};
use session::{ConfigurationSource, EnvConfigurationSource, SessionController};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing(cli.mode == RunMode::Stdio);
    info!("Starting mcp-assistant");
    debug!(mode = ?cli.mode, config = ?cli.config, env_file = ?cli.env_file, "CLI arguments parsed");

    if let Some(path) = &cli.env_file {
        config::load_env_file(path);
    }
    config::ensure_env_loaded();

    let settings = AppSettings::load(cli.config.as_deref())?.apply_env(&config::ProcessEnv)?;
    let settings = cli.apply(settings);
    info!(
        model = %settings.model,
        endpoint = %settings.model_endpoint,
        max_steps = settings.max_steps,
        "Settings resolved"
    );

    let factory: Arc<dyn AgentFactory> = Arc::new(OpenAIAgentFactory::new(settings.clone()));
    let source: Arc<dyn ConfigurationSource> = Arc::new(EnvConfigurationSource);

    match cli.mode {
        RunMode::Stdio => {
            info!("Launching terminal chat");
            stdio::run(SessionController::new(factory, source)).await?;
        }
        RunMode::Web => {
            info!(addr = %settings.bind_addr, "Starting web server");
            let state = Arc::new(
                server::AppState::new(factory, source)
                    .with_idle_timeout(settings.session_idle_timeout),
            );
            server::serve(state, settings.bind_addr).await?;
        }
    }

    info!("mcp-assistant finished");
    Ok(())
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let default_level = if quiet { "warn" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
