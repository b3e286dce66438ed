// Configuration builder tests - live process environment
//
// These mutate process-wide environment variables and therefore run serially.

use mcp_assistant::config::{ServerDescriptor, build_configuration};
use serial_test::serial;
use std::env;

const SECRETS: [&str; 5] = [
    "OPENAI_API_KEY",
    "BROWSERBASE_API_KEY",
    "BROWSERBASE_PROJECT_ID",
    "FIRECRAWL_API_KEY",
    "RAGIE_API_KEY",
];

fn clear_secrets() {
    for key in SECRETS {
        // SAFETY: tests touching the environment are serialised.
        unsafe { env::remove_var(key) };
    }
}

fn env_of<'a>(descriptor: &'a ServerDescriptor, key: &str) -> Option<&'a str> {
    match descriptor {
        ServerDescriptor::Process { env, .. } => env.get(key).map(String::as_str),
        ServerDescriptor::EventStream { .. } => None,
    }
}

#[test]
#[serial]
fn builds_all_servers_without_credentials() {
    clear_secrets();

    let configuration = build_configuration();

    assert_eq!(
        configuration.names(),
        vec![
            "browserbase",
            "mcp-server-firecrawl",
            "graphiti",
            "ragie",
            "mcp-git-ingest",
            "desktop-commander"
        ]
    );
    let firecrawl = configuration.get("mcp-server-firecrawl").expect("firecrawl");
    assert_eq!(env_of(firecrawl, "FIRECRAWL_API_KEY"), Some(""));
}

#[test]
#[serial]
fn picks_up_secrets_on_every_build() {
    clear_secrets();
    let before = build_configuration();

    // SAFETY: tests touching the environment are serialised.
    unsafe { env::set_var("RAGIE_API_KEY", "rg-123") };
    let after = build_configuration();
    clear_secrets();

    assert_eq!(env_of(before.get("ragie").expect("ragie"), "RAGIE_API_KEY"), Some(""));
    assert_eq!(
        env_of(after.get("ragie").expect("ragie"), "RAGIE_API_KEY"),
        Some("rg-123")
    );
}

#[test]
#[serial]
fn identical_environment_gives_identical_configuration() {
    clear_secrets();
    // SAFETY: tests touching the environment are serialised.
    unsafe { env::set_var("FIRECRAWL_API_KEY", "fc-abc") };

    let first = build_configuration();
    let second = build_configuration();
    clear_secrets();

    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}
