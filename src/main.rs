//! Moonwatch - exchange surveillance bot
//!
//! Reads `$start`, `$stop`, `$greet`, `$help` and `$exit` from stdin.

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use moonwatch::config::{AppConfig, BotConfig};
use moonwatch::error::EngineError;
use moonwatch::surveillance::{ShutdownReason, StartOutcome, SurveillanceEngine};

const CONSOLE_USER: &str = "@console";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start(String),
    Stop(String),
    Greet(String),
    Help,
    Exit(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let mention = |arg: Option<&str>| arg.unwrap_or(CONSOLE_USER).to_string();

    match parts.next()? {
        "$start" => Some(Command::Start(mention(parts.next()))),
        "$stop" => Some(Command::Stop(mention(parts.next()))),
        "$greet" => Some(Command::Greet(mention(parts.next()))),
        "$help" => Some(Command::Help),
        "$exit" => Some(Command::Exit(mention(parts.next()))),
        _ => None,
    }
}

fn init_tracing(bot: &BotConfig) {
    let default_filter = if bot.debug {
        "moonwatch=debug"
    } else {
        "moonwatch=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if bot.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn report_start(outcome: Result<StartOutcome, EngineError>) {
    match outcome {
        Ok(StartOutcome::Started { baseline_symbols }) => {
            info!(symbols = baseline_symbols, "Watching market");
        }
        Ok(StartOutcome::AlreadyRunning) => info!("Surveillance is already running"),
        Err(e) => error!(error = %e, "Failed to start surveillance"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.bot);
    config.validate()?;

    info!("🌙 Moonwatch {}", config.digest());

    let engine = SurveillanceEngine::from_config(&config)?;
    let mut shutdown = engine.shutdown_signal();

    report_start(engine.start_surveillance().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let reason = loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Command::Start(mention)) => {
                        report_start(engine.start_requested(&mention).await)
                    }
                    Some(Command::Stop(mention)) => {
                        if !engine.stop_requested(&mention).await {
                            info!("Surveillance is not running");
                        }
                    }
                    Some(Command::Greet(mention)) => engine.greet(&mention).await,
                    Some(Command::Help) => {
                        info!("Commands: $start [@who] | $stop [@who] | $greet [@who] | $exit [@who] | $help");
                    }
                    Some(Command::Exit(mention)) => engine.shutdown_process(&mention).await,
                    None if line.trim().is_empty() => {}
                    None => warn!(input = %line.trim(), "Unknown command, try $help"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "Console closed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                engine.stop_surveillance();
                break ShutdownReason::Requested { by: "signal".to_string() };
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break ShutdownReason::Requested { by: "engine".to_string() };
                }
                if let Some(reason) = shutdown.borrow_and_update().clone() {
                    break reason;
                }
            }
        }
    };

    match reason {
        ShutdownReason::Requested { by } => {
            info!(by = %by, "👋 Shutting down");
            // Grace period for a cycle in flight
            if let Err(e) = tokio::time::timeout(
                std::time::Duration::from_secs(5),
                engine.wait_stopped(),
            )
            .await
            .unwrap_or(Ok(0))
            {
                warn!(error = %e, "Surveillance ended with an error");
            }
            Ok(())
        }
        ShutdownReason::UpstreamRejected(message) => {
            bail!("exchange rejected a request: {}", message)
        }
    }
}
