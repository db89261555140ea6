//! Interactive console binary for the SAMi session client.
//!
//! Reads commands from stdin line by line, renders channel activity to
//! stdout, and keeps tracing on stderr so the conversation stays readable.
//!
//! Line escapes:
//! - `:mic`            toggle the backend microphone
//! - `:voice`          toggle local hands-free speech capture
//! - `:view <mode>`    switch between `robot` and `screen` views
//! - `:analyze <path>` upload an image file for analysis
//! - `:prev` / `:next` walk the command history
//! - `:quit`           exit
//!
//! Anything else is sent as a text command.

use sami::speech::UnsupportedCapability;
use sami::{ChannelNotice, ClientConfig, EventChannel, Session, ViewMode};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing goes to stderr so stdout stays a clean transcript.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sami=info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!("connecting to {}", config.server.base_url);

    let (channel, mut notices) = EventChannel::connect(config.server.ws_url());
    // The console has no platform speech recognizer; `:voice` surfaces the
    // capability-unavailable notice instead.
    let mut session = Session::new(&config, channel, UnsupportedCapability);

    println!("SAMi console v{}", env!("CARGO_PKG_VERSION"));
    println!("Type a command, or :quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            notice = notices.recv() => {
                match notice {
                    Some(notice) => {
                        let before = session.transcript().len();
                        session.handle_notice(notice).await;
                        render_new_entries(&session, before);
                        render_alerts(&mut session);
                    }
                    None => {
                        eprintln!("event channel closed");
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let before = session.transcript().len();
                if !handle_line(&mut session, line.trim()).await {
                    break;
                }
                render_new_entries(&session, before);
                render_alerts(&mut session);
            }
        }
    }

    Ok(())
}

/// Resolve the config path: `SAMI_CONFIG` override, else the platform config
/// directory, else defaults.
fn load_config() -> anyhow::Result<ClientConfig> {
    let path = std::env::var_os("SAMI_CONFIG").map(PathBuf::from).or_else(|| {
        dirs::config_dir().map(|dir| dir.join("sami").join("config.toml"))
    });

    match path {
        Some(path) if path.exists() => {
            tracing::info!("loading config from {}", path.display());
            Ok(ClientConfig::from_file(&path)?)
        }
        _ => Ok(ClientConfig::default()),
    }
}

/// Handle one input line. Returns `false` to exit.
async fn handle_line(session: &mut Session<UnsupportedCapability>, line: &str) -> bool {
    match line {
        "" => {}
        ":quit" | ":q" => return false,
        ":mic" => session.toggle_mic(),
        ":voice" => session.toggle_speech(),
        ":view robot" => session.set_view_mode(ViewMode::Robot),
        ":view screen" => {
            session.set_view_mode(ViewMode::Screen);
            if let Some(url) = session.video_feed_url() {
                println!("-- video feed: {url}");
            }
        }
        ":prev" => {
            if let Some(cmd) = session.recall_previous() {
                println!("-- recalled: {cmd}");
            }
        }
        ":next" => {
            if let Some(cmd) = session.recall_next() {
                println!("-- recalled: {cmd}");
            }
        }
        _ if line.starts_with(":analyze ") => {
            let path = line.trim_start_matches(":analyze ").trim();
            match std::fs::read(path) {
                Ok(bytes) => {
                    let data_url = sami::analysis::encode_upload(path, &bytes);
                    session.analyze_upload(data_url).await;
                }
                Err(e) => println!("-- cannot read {path}: {e}"),
            }
        }
        _ => session.send_command(line),
    }
    true
}

/// Print transcript entries appended since `before`, newest last, so the
/// latest entry is always the one on screen.
fn render_new_entries(session: &Session<UnsupportedCapability>, before: usize) {
    for entry in &session.transcript().entries()[before..] {
        println!("{}", entry.display_text());
    }
}

fn render_alerts(session: &mut Session<UnsupportedCapability>) {
    for alert in session.take_alerts() {
        println!("!! {}", alert.message);
    }
}
