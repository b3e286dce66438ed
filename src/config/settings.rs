use super::env::EnvSource;
use super::error::ConfigError;
use crate::constants::{
    CONFIG_PATH, DEFAULT_BIND_ADDR, DEFAULT_MAX_STEPS, DEFAULT_MODEL, DEFAULT_MODEL_ENDPOINT,
    DEFAULT_SESSION_IDLE_SECS,
};
use serde::Deserialize;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const MODEL_NAME_VAR: &str = "OPENAI_MODEL";
pub const MODEL_ENDPOINT_VAR: &str = "OPENAI_BASE_URL";
pub const MAX_STEPS_VAR: &str = "MCP_AGENT_MAX_STEPS";
pub const BIND_ADDR_VAR: &str = "MCP_ASSISTANT_ADDR";
pub const SESSION_IDLE_VAR: &str = "MCP_SESSION_IDLE_SECS";

/// Non-secret runtime settings.
///
/// Layering: defaults, then the optional TOML file, then environment
/// variables, then CLI flags (applied by the caller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub model: String,
    pub model_endpoint: String,
    pub max_steps: usize,
    pub bind_addr: SocketAddr,
    /// How long a web session may go unused before it is evicted.
    pub session_idle_timeout: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            model_endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8501))),
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    model: RawModel,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    web: RawWeb,
}

#[derive(Debug, Deserialize, Default)]
struct RawModel {
    name: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAgent {
    max_steps: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawWeb {
    addr: Option<SocketAddr>,
    session_idle_secs: Option<u64>,
}

impl AppSettings {
    /// Loads settings from `path`, or from the default path when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_settings(path);
        }
        match read_settings(Path::new(CONFIG_PATH)) {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound { .. }) => {
                info!("Settings file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(mut self, env: &impl EnvSource) -> Result<Self, ConfigError> {
        if let Some(model) = non_empty(env.var(MODEL_NAME_VAR)) {
            self.model = model;
        }
        if let Some(endpoint) = non_empty(env.var(MODEL_ENDPOINT_VAR)) {
            self.model_endpoint = endpoint;
        }
        if let Some(raw) = non_empty(env.var(MAX_STEPS_VAR)) {
            self.max_steps = parse_max_steps(MAX_STEPS_VAR, &raw)?;
        }
        if let Some(raw) = non_empty(env.var(BIND_ADDR_VAR)) {
            self.bind_addr = raw.parse().map_err(|err: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    key: BIND_ADDR_VAR.to_string(),
                    value: raw.clone(),
                    reason: err.to_string(),
                }
            })?;
        }
        if let Some(raw) = non_empty(env.var(SESSION_IDLE_VAR)) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: SESSION_IDLE_VAR.to_string(),
                value: raw.clone(),
                reason: "expected a whole number of seconds".to_string(),
            })?;
            self.session_idle_timeout = idle_timeout(SESSION_IDLE_VAR, secs)?;
        }
        Ok(self)
    }
}

fn idle_timeout(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

pub(crate) fn parse_max_steps(key: &str, raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let steps: usize = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected a positive integer"))?;
    if steps == 0 {
        return Err(invalid("must be at least 1"));
    }
    Ok(steps)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_settings(path: &Path) -> Result<AppSettings, ConfigError> {
    debug!(path = %path.display(), "Reading settings file");
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let parsed: RawSettings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let defaults = AppSettings::default();
    let max_steps = match parsed.agent.max_steps {
        Some(0) => {
            return Err(ConfigError::InvalidValue {
                key: "agent.max_steps".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Some(steps) => steps,
        None => defaults.max_steps,
    };
    let session_idle_timeout = match parsed.web.session_idle_secs {
        Some(secs) => idle_timeout("web.session_idle_secs", secs)?,
        None => defaults.session_idle_timeout,
    };

    Ok(AppSettings {
        model: parsed.model.name.unwrap_or(defaults.model),
        model_endpoint: parsed
            .model
            .endpoint
            .map(|endpoint| {
                shellexpand::env(&endpoint)
                    .map(|cow| cow.into_owned())
                    .unwrap_or(endpoint)
            })
            .unwrap_or(defaults.model_endpoint),
        max_steps,
        bind_addr: parsed.web.addr.unwrap_or(defaults.bind_addr),
        session_idle_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = AppSettings::load(Some(Path::new("/nonexistent/assistant.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn reads_partial_settings_and_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("assistant.toml");
        fs::write(
            &path,
            r#"
[agent]
max_steps = 12
"#,
        )
        .expect("write");

        let settings = AppSettings::load(Some(&path)).expect("load");
        assert_eq!(settings.max_steps, 12);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.model_endpoint, DEFAULT_MODEL_ENDPOINT);
    }

    #[test]
    fn reads_full_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("assistant.toml");
        fs::write(
            &path,
            r#"
[model]
name = "gpt-4o-mini"
endpoint = "http://localhost:4000"

[web]
addr = "0.0.0.0:9000"
session_idle_secs = 600
"#,
        )
        .expect("write");

        let settings = AppSettings::load(Some(&path)).expect("load");
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.model_endpoint, "http://localhost:4000");
        assert_eq!(settings.bind_addr, "0.0.0.0:9000".parse().expect("addr"));
        assert_eq!(settings.session_idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn rejects_zero_steps_in_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("assistant.toml");
        fs::write(&path, "[agent]\nmax_steps = 0\n").expect("write");
        assert!(matches!(
            AppSettings::load(Some(&path)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("assistant.toml");
        fs::write(&path, "[agent\nmax_steps = ").expect("write");
        assert!(matches!(
            AppSettings::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (MODEL_NAME_VAR, "gpt-4.1"),
            (MAX_STEPS_VAR, "25"),
            (BIND_ADDR_VAR, "127.0.0.1:7000"),
            (SESSION_IDLE_VAR, "90"),
        ]
        .into_iter()
        .collect();
        let settings = AppSettings::default().apply_env(&env).expect("apply env");
        assert_eq!(settings.model, "gpt-4.1");
        assert_eq!(settings.max_steps, 25);
        assert_eq!(settings.bind_addr.port(), 7000);
        assert_eq!(settings.session_idle_timeout, Duration::from_secs(90));
        assert_eq!(settings.model_endpoint, DEFAULT_MODEL_ENDPOINT);
    }

    #[test]
    fn invalid_step_override_is_reported() {
        let env: HashMap<&str, &str> = [(MAX_STEPS_VAR, "many")].into_iter().collect();
        let err = AppSettings::default()
            .apply_env(&env)
            .expect_err("invalid value");
        assert!(err.to_string().contains(MAX_STEPS_VAR));
    }
}
