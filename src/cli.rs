use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::AppSettings;

#[derive(Parser, Debug)]
#[command(
    name = "mcp-assistant",
    version,
    about = "Chat with an agent backed by pre-configured MCP tool servers"
)]
pub struct Cli {
    #[arg(long, short, value_enum, default_value_t = RunMode::Web)]
    pub mode: RunMode,
    /// Address for the web surface (overrides settings)
    #[arg(long)]
    pub addr: Option<SocketAddr>,
    /// Settings file; defaults to config/assistant.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Extra dotenv file loaded before the default .env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_steps: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RunMode {
    /// Browser chat page and JSON API
    Web,
    /// Interactive terminal chat
    Stdio,
}

impl Cli {
    /// Applies flag overrides on top of file and environment settings.
    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(addr) = self.addr {
            settings.bind_addr = addr;
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(max_steps) = self.max_steps {
            settings.max_steps = max_steps as usize;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_web_mode() {
        let cli = Cli::parse_from(["mcp-assistant"]);
        assert_eq!(cli.mode, RunMode::Web);
        assert_eq!(cli.apply(AppSettings::default()), AppSettings::default());
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "mcp-assistant",
            "--mode",
            "stdio",
            "--addr",
            "0.0.0.0:9000",
            "--model",
            "gpt-4o-mini",
            "--max-steps",
            "12",
        ]);
        let settings = cli.apply(AppSettings::default());
        assert_eq!(cli.mode, RunMode::Stdio);
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_steps, 12);
    }

    #[test]
    fn rejects_zero_max_steps() {
        assert!(Cli::try_parse_from(["mcp-assistant", "--max-steps", "0"]).is_err());
    }
}
