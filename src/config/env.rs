use dotenvy::from_filename;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

use crate::constants::ENV_PATH;

static ENV_LOADER: Once = Once::new();

/// Read-only view over environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;

    /// Value of `key`, or an empty string when unset.
    fn var_or_empty(&self, key: &str) -> String {
        self.var(key).unwrap_or_default()
    }
}

/// The live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.to_string())
    }
}

/// Loads `.env` into the process environment once per process.
///
/// Variables already present in the environment win over the file.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| load_env_file(Path::new(ENV_PATH)));
}

/// Loads a specific env file; used when the CLI names one explicitly.
pub fn load_env_file(path: &Path) {
    match from_filename(path) {
        Ok(loaded) => debug!(path = %loaded.display(), "Loaded environment file"),
        Err(err) => debug!(path = %path.display(), %err, "Environment file not loaded"),
    }
}
