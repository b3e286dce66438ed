//! Tool-server configuration assembled from the environment.
//!
//! Secrets are re-read on every call and missing variables pass through as
//! empty strings; tool servers report bad credentials when they are used.

use super::descriptor::{Configuration, ServerDescriptor};
use super::env::{EnvSource, ProcessEnv, ensure_env_loaded};
use tracing::debug;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const BROWSERBASE_API_KEY: &str = "BROWSERBASE_API_KEY";
pub const BROWSERBASE_PROJECT_ID: &str = "BROWSERBASE_PROJECT_ID";
pub const FIRECRAWL_API_KEY: &str = "FIRECRAWL_API_KEY";
pub const RAGIE_API_KEY: &str = "RAGIE_API_KEY";

pub const BROWSERBASE_CLI_PATH: &str = "BROWSERBASE_CLI_PATH";
pub const RAGIE_PARTITION_ID: &str = "RAGIE_PARTITION_ID";
pub const GRAPHITI_SSE_URL: &str = "GRAPHITI_SSE_URL";

const DEFAULT_BROWSERBASE_CLI: &str = "mcp-server-browserbase/cli.js";
const DEFAULT_RAGIE_PARTITION: &str = "default";
const DEFAULT_GRAPHITI_URL: &str = "http://localhost:8000/sse";
const BROWSERBASE_MODEL: &str = "openai/gpt-4o";

/// Builds the configuration from the live process environment.
pub fn build_configuration() -> Configuration {
    ensure_env_loaded();
    build_configuration_from(&ProcessEnv)
}

/// Builds the configuration from an arbitrary environment view.
pub fn build_configuration_from(env: &impl EnvSource) -> Configuration {
    let openai_key = env.var_or_empty(OPENAI_API_KEY);

    let browserbase_cli = expand_path(
        &env.var(BROWSERBASE_CLI_PATH)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BROWSERBASE_CLI.to_string()),
    );
    let ragie_partition = env
        .var(RAGIE_PARTITION_ID)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_RAGIE_PARTITION.to_string());
    let graphiti_url = env
        .var(GRAPHITI_SSE_URL)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_GRAPHITI_URL.to_string());

    let config = Configuration::new()
        .with_server(
            "browserbase",
            ServerDescriptor::process(
                "node",
                [
                    browserbase_cli,
                    "--modelName".to_string(),
                    BROWSERBASE_MODEL.to_string(),
                    "--modelApiKey".to_string(),
                    openai_key,
                ],
            )
            .with_env(BROWSERBASE_API_KEY, env.var_or_empty(BROWSERBASE_API_KEY))
            .with_env(
                BROWSERBASE_PROJECT_ID,
                env.var_or_empty(BROWSERBASE_PROJECT_ID),
            ),
        )
        .with_server(
            "mcp-server-firecrawl",
            ServerDescriptor::process("npx", ["-y", "firecrawl-mcp"])
                .with_env(FIRECRAWL_API_KEY, env.var_or_empty(FIRECRAWL_API_KEY)),
        )
        .with_server("graphiti", ServerDescriptor::event_stream(graphiti_url))
        .with_server(
            "ragie",
            ServerDescriptor::process(
                "npx",
                [
                    "-y".to_string(),
                    "@ragieai/mcp-server".to_string(),
                    "--partition".to_string(),
                    ragie_partition,
                ],
            )
            .with_env(RAGIE_API_KEY, env.var_or_empty(RAGIE_API_KEY)),
        )
        .with_server(
            "mcp-git-ingest",
            ServerDescriptor::process(
                "uvx",
                [
                    "--from",
                    "git+https://github.com/adhikasp/mcp-git-ingest",
                    "mcp-git-ingest",
                ],
            ),
        )
        .with_server(
            "desktop-commander",
            ServerDescriptor::process("npx", ["-y", "@wonderwhy-er/desktop-commander"]),
        );

    debug!(servers = config.len(), "Built tool-server configuration");
    config
}

fn expand_path(raw: &str) -> String {
    shellexpand::full(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn env_of(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
        pairs.iter().copied().collect()
    }

    fn process_env(config: &Configuration, name: &str) -> BTreeMap<String, String> {
        match config.get(name) {
            Some(ServerDescriptor::Process { env, .. }) => env.clone(),
            other => panic!("expected process descriptor for {name}, got {other:?}"),
        }
    }

    #[test]
    fn builds_every_server_in_order() {
        let config = build_configuration_from(&env_of(&[]));
        assert_eq!(
            config.names(),
            vec![
                "browserbase",
                "mcp-server-firecrawl",
                "graphiti",
                "ragie",
                "mcp-git-ingest",
                "desktop-commander",
            ]
        );
    }

    #[test]
    fn missing_credentials_become_empty_strings() {
        let config = build_configuration_from(&env_of(&[]));
        assert!(!config.is_empty());

        let browserbase = process_env(&config, "browserbase");
        assert_eq!(browserbase[BROWSERBASE_API_KEY], "");
        assert_eq!(browserbase[BROWSERBASE_PROJECT_ID], "");
        assert_eq!(process_env(&config, "mcp-server-firecrawl")[FIRECRAWL_API_KEY], "");
        assert_eq!(process_env(&config, "ragie")[RAGIE_API_KEY], "");
    }

    #[test]
    fn secrets_are_read_from_the_environment() {
        let config = build_configuration_from(&env_of(&[
            (OPENAI_API_KEY, "sk-test"),
            (BROWSERBASE_API_KEY, "bb-key"),
            (BROWSERBASE_PROJECT_ID, "bb-project"),
            (FIRECRAWL_API_KEY, "fc-key"),
            (RAGIE_API_KEY, "rg-key"),
        ]));

        let Some(ServerDescriptor::Process { args, env, .. }) = config.get("browserbase") else {
            panic!("browserbase must be a process server");
        };
        let key_flag = args
            .iter()
            .position(|arg| arg == "--modelApiKey")
            .expect("api key flag present");
        assert_eq!(args[key_flag + 1], "sk-test");
        assert_eq!(env[BROWSERBASE_PROJECT_ID], "bb-project");
        assert_eq!(process_env(&config, "mcp-server-firecrawl")[FIRECRAWL_API_KEY], "fc-key");
        assert_eq!(process_env(&config, "ragie")[RAGIE_API_KEY], "rg-key");
    }

    #[test]
    fn identical_environment_gives_identical_configuration() {
        let env = env_of(&[(FIRECRAWL_API_KEY, "fc-key")]);
        assert_eq!(build_configuration_from(&env), build_configuration_from(&env));
    }

    #[test]
    fn graph_memory_is_an_event_stream_server() {
        let config = build_configuration_from(&env_of(&[]));
        assert_eq!(
            config.get("graphiti"),
            Some(&ServerDescriptor::event_stream(DEFAULT_GRAPHITI_URL))
        );

        let overridden = build_configuration_from(&env_of(&[(
            GRAPHITI_SSE_URL,
            "http://graph.internal:9000/sse",
        )]));
        assert_eq!(
            overridden.get("graphiti"),
            Some(&ServerDescriptor::event_stream("http://graph.internal:9000/sse"))
        );
    }

    #[test]
    fn ragie_partition_can_be_overridden() {
        let config = build_configuration_from(&env_of(&[(RAGIE_PARTITION_ID, "team-docs")]));
        let Some(ServerDescriptor::Process { args, .. }) = config.get("ragie") else {
            panic!("ragie must be a process server");
        };
        assert_eq!(args.last().map(String::as_str), Some("team-docs"));
    }

    #[test]
    fn blank_overrides_fall_back_to_defaults() {
        let config = build_configuration_from(&env_of(&[
            (BROWSERBASE_CLI_PATH, "  "),
            (RAGIE_PARTITION_ID, ""),
            (GRAPHITI_SSE_URL, " "),
        ]));

        let Some(ServerDescriptor::Process { args, .. }) = config.get("browserbase") else {
            panic!("browserbase must be a process server");
        };
        assert_eq!(args[0], DEFAULT_BROWSERBASE_CLI);
        let Some(ServerDescriptor::Process { args, .. }) = config.get("ragie") else {
            panic!("ragie must be a process server");
        };
        assert_eq!(args.last().map(String::as_str), Some(DEFAULT_RAGIE_PARTITION));
        assert_eq!(
            config.get("graphiti"),
            Some(&ServerDescriptor::event_stream(DEFAULT_GRAPHITI_URL))
        );
    }
}
