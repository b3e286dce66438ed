use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Argument flags whose following value is a credential.
const SECRET_ARG_FLAGS: &[&str] = &["--modelApiKey"];
const REDACTED: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamTransport {
    #[serde(rename = "sse")]
    Sse,
}

/// How to reach one tool server.
///
/// Wire shapes: `{command, args, env}` for a local executable and
/// `{transport: "sse", url}` for a network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerDescriptor {
    EventStream {
        transport: StreamTransport,
        url: String,
    },
    Process {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
}

impl ServerDescriptor {
    pub fn process<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Process {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn event_stream(url: impl Into<String>) -> Self {
        Self::EventStream {
            transport: StreamTransport::Sse,
            url: url.into(),
        }
    }

    /// Adds an environment variable to a process descriptor; no-op for event streams.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Process { env, .. } = &mut self {
            env.insert(key.into(), value.into());
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Process { .. } => "process",
            Self::EventStream { .. } => "event-stream",
        }
    }

    /// Copy with credential values masked, for display.
    pub fn redacted(&self) -> Self {
        match self {
            Self::EventStream { .. } => self.clone(),
            Self::Process { command, args, env } => {
                let mut masked_args = Vec::with_capacity(args.len());
                let mut mask_next = false;
                for arg in args {
                    if mask_next {
                        masked_args.push(mask(arg));
                    } else {
                        masked_args.push(arg.clone());
                    }
                    mask_next = SECRET_ARG_FLAGS.contains(&arg.as_str());
                }
                Self::Process {
                    command: command.clone(),
                    args: masked_args,
                    env: env
                        .iter()
                        .map(|(key, value)| (key.clone(), mask(value)))
                        .collect(),
                }
            }
        }
    }
}

fn mask(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        REDACTED.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedServer {
    pub name: String,
    pub descriptor: ServerDescriptor,
}

/// Ordered mapping from unique server name to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    servers: Vec<NamedServer>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a server; an existing entry with the same name is replaced in place.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ServerDescriptor) {
        let name = name.into();
        match self.servers.iter_mut().find(|entry| entry.name == name) {
            Some(existing) => existing.descriptor = descriptor,
            None => self.servers.push(NamedServer { name, descriptor }),
        }
    }

    pub fn with_server(mut self, name: impl Into<String>, descriptor: ServerDescriptor) -> Self {
        self.insert(name, descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.descriptor)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedServer> {
        self.servers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.servers.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn redacted(&self) -> Self {
        Self {
            servers: self
                .servers
                .iter()
                .map(|entry| NamedServer {
                    name: entry.name.clone(),
                    descriptor: entry.descriptor.redacted(),
                })
                .collect(),
        }
    }

    /// `{"mcpServers": {...}}` document handed to the tool client.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = &'a NamedServer;
    type IntoIter = std::slice::Iter<'a, NamedServer>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.iter()
    }
}

struct ServerMap<'a>(&'a [NamedServer]);

impl Serialize for ServerMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.name, &entry.descriptor)?;
        }
        map.end()
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("mcpServers", &ServerMap(&self.servers))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn process_descriptor_uses_command_shape() {
        let descriptor = ServerDescriptor::process("npx", ["-y", "firecrawl-mcp"])
            .with_env("FIRECRAWL_API_KEY", "fc-123");
        assert_eq!(
            serde_json::to_value(&descriptor).expect("serialize"),
            json!({
                "command": "npx",
                "args": ["-y", "firecrawl-mcp"],
                "env": { "FIRECRAWL_API_KEY": "fc-123" }
            })
        );
    }

    #[test]
    fn event_stream_descriptor_uses_transport_shape() {
        let descriptor = ServerDescriptor::event_stream("http://localhost:8000/sse");
        assert_eq!(
            serde_json::to_value(&descriptor).expect("serialize"),
            json!({ "transport": "sse", "url": "http://localhost:8000/sse" })
        );
    }

    #[test]
    fn descriptors_deserialize_into_the_matching_variant() {
        let stream: ServerDescriptor =
            serde_json::from_value(json!({ "transport": "sse", "url": "http://x/sse" }))
                .expect("stream");
        assert_eq!(stream.kind(), "event-stream");

        let process: ServerDescriptor =
            serde_json::from_value(json!({ "command": "uvx" })).expect("process");
        assert_eq!(process, ServerDescriptor::process("uvx", Vec::<String>::new()));
    }

    #[test]
    fn insert_replaces_duplicates_in_place() {
        let mut config = Configuration::new()
            .with_server("a", ServerDescriptor::event_stream("http://a"))
            .with_server("b", ServerDescriptor::event_stream("http://b"));
        config.insert("a", ServerDescriptor::event_stream("http://a2"));

        assert_eq!(config.len(), 2);
        assert_eq!(config.names(), vec!["a", "b"]);
        assert_eq!(
            config.get("a"),
            Some(&ServerDescriptor::event_stream("http://a2"))
        );
    }

    #[test]
    fn serializes_servers_in_insertion_order() {
        let config = Configuration::new()
            .with_server("zeta", ServerDescriptor::event_stream("http://z"))
            .with_server("alpha", ServerDescriptor::process("node", ["cli.js"]));
        let text = serde_json::to_string(&config).expect("serialize");
        let zeta = text.find("zeta").expect("zeta present");
        let alpha = text.find("alpha").expect("alpha present");
        assert!(text.starts_with("{\"mcpServers\":"));
        assert!(zeta < alpha);
    }

    #[test]
    fn redaction_masks_env_values_and_secret_args() {
        let descriptor = ServerDescriptor::process(
            "node",
            ["cli.js", "--modelApiKey", "sk-live", "--modelName", "openai/gpt-4o"],
        )
        .with_env("BROWSERBASE_API_KEY", "bb-key")
        .with_env("BROWSERBASE_PROJECT_ID", "");

        let ServerDescriptor::Process { args, env, .. } = descriptor.redacted() else {
            panic!("expected process descriptor");
        };
        assert_eq!(args[2], REDACTED);
        assert_eq!(args[4], "openai/gpt-4o");
        assert_eq!(env["BROWSERBASE_API_KEY"], REDACTED);
        assert_eq!(env["BROWSERBASE_PROJECT_ID"], "");
    }
}
