//! Line-oriented terminal front-end over a single session.

use crate::config::build_configuration;
use crate::session::{Notice, NoticeLevel, SessionController, SessionState, SubmitOutcome};
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

const PROMPT: &str = "you> ";
const HELP: &str = "Commands: /activate, /reset, /status, /config, /help, /quit. Anything else is sent to the assistant.";

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Activate,
    Reset,
    Status,
    Config,
    Help,
    Quit,
    Unknown(&'a str),
    Query(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Command::Query(trimmed);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "/activate" => Command::Activate,
        "/reset" | "/clear" => Command::Reset,
        "/status" => Command::Status,
        "/config" => Command::Config,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(trimmed),
    }
}

/// Runs the REPL on the process's stdin and stdout.
pub async fn run(controller: SessionController) -> Result<(), StdioError> {
    run_with(controller, BufReader::new(io::stdin()), io::stdout()).await
}

pub async fn run_with<R, W>(
    mut controller: SessionController,
    reader: R,
    mut writer: W,
) -> Result<(), StdioError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Terminal session started");
    write_line(&mut writer, HELP).await?;
    let mut lines = reader.lines();

    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Query("") => continue,
            Command::Query(text) => {
                debug!("Received terminal query");
                match controller.submit_query(text).await {
                    SubmitOutcome::Rejected(notice) => write_notice(&mut writer, &notice).await?,
                    SubmitOutcome::Completed(outcome) => {
                        write_line(&mut writer, &format!("assistant> {}", outcome.render())).await?
                    }
                }
            }
            Command::Activate => {
                write_line(&mut writer, "Activating configuration...").await?;
                let notice = controller.activate().await;
                write_notice(&mut writer, &notice).await?;
            }
            Command::Reset => {
                let notice = controller.reset().await;
                write_notice(&mut writer, &notice).await?;
            }
            Command::Status => {
                let status = controller.status();
                match (status.state, status.configuration) {
                    (SessionState::Active, Some(configuration)) => {
                        write_notice(&mut writer, &Notice::success("Agent ready")).await?;
                        write_line(&mut writer, &serde_json::to_string_pretty(&configuration)?)
                            .await?;
                    }
                    _ => {
                        write_notice(&mut writer, &Notice::warning("Configuration not activated"))
                            .await?
                    }
                }
                write_line(&mut writer, &format!("{} turns in transcript", status.transcript.len()))
                    .await?;
            }
            Command::Config => {
                let configuration = build_configuration().redacted();
                write_line(&mut writer, &serde_json::to_string_pretty(&configuration)?).await?;
            }
            Command::Help => write_line(&mut writer, HELP).await?,
            Command::Quit => break,
            Command::Unknown(command) => {
                let notice = Notice::warning(format!("Unknown command {command}. Try /help."));
                write_notice(&mut writer, &notice).await?;
            }
        }
    }

    controller.reset().await;
    writer.flush().await?;
    info!("Terminal session ended");
    Ok(())
}

async fn write_notice<W: AsyncWrite + Unpin>(writer: &mut W, notice: &Notice) -> Result<(), StdioError> {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    write_line(writer, &format!("[{tag}] {}", notice.message)).await
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<(), StdioError> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
