// Settings loading tests - file, environment and CLI layering
//
// Tests focused on how AppSettings combines its sources.

use clap::Parser;
use mcp_assistant::config::{AppSettings, ConfigError};
use mcp_assistant::Cli;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_settings(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("assistant.toml");
    fs::write(&path, content).expect("Failed to write settings");
    path
}

#[test]
fn explicit_missing_file_is_an_error() {
    let result = AppSettings::load(Some(Path::new("/nonexistent/path/assistant.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn file_values_replace_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = write_settings(
        dir.path(),
        r#"
[model]
name = "gpt-4o-mini"
endpoint = "http://localhost:4000"

[agent]
max_steps = 25

[web]
addr = "0.0.0.0:8600"
"#,
    );

    let settings = AppSettings::load(Some(&path)).expect("settings load");
    assert_eq!(settings.model, "gpt-4o-mini");
    assert_eq!(settings.model_endpoint, "http://localhost:4000");
    assert_eq!(settings.max_steps, 25);
    assert_eq!(settings.bind_addr.port(), 8600);
}

#[test]
fn zero_step_ceiling_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = write_settings(dir.path(), "[agent]\nmax_steps = 0\n");
    let result = AppSettings::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn unknown_sections_fail_to_parse() {
    let dir = tempdir().expect("tempdir");
    let path = write_settings(dir.path(), "[providers]\nid = \"ollama\"\n");
    let result = AppSettings::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn layers_apply_in_order() {
    let dir = tempdir().expect("tempdir");
    let path = write_settings(
        dir.path(),
        "[model]\nname = \"from-file\"\n\n[agent]\nmax_steps = 10\n",
    );
    let env: HashMap<&str, &str> = HashMap::from([
        ("OPENAI_MODEL", "from-env"),
        ("MCP_AGENT_MAX_STEPS", "20"),
    ]);
    let cli = Cli::parse_from(["mcp-assistant", "--max-steps", "30"]);

    let settings = AppSettings::load(Some(&path))
        .and_then(|settings| settings.apply_env(&env))
        .map(|settings| cli.apply(settings))
        .expect("settings resolve");

    assert_eq!(settings.model, "from-env");
    assert_eq!(settings.max_steps, 30);
}
