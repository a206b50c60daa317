//! CLI Command Handlers
//!
//! Each handler takes CLI args, the resolved server URL and Output, and
//! returns an ExitCode.

use std::time::Duration;

use crate::api::LectureClient;
use crate::cli::{
    CurrentCmd, ExitCode, LanguagesCmd, LanguagesResponse, Output, SentenceLine, SubtitleEntry,
    WatchCmd,
};
use crate::event::{self, AppEvent};
use crate::models::{ConnectionStatus, SubtitleEvent};
use crate::net::{ChannelEvent, Connection, ConnectionConfig, ServerEvent};
use crate::reconciler::{Outcome, Reconciler};

// =============================================================================
// Languages Command
// =============================================================================

pub async fn languages_cmd(_cmd: LanguagesCmd, server: &str, output: &Output) -> ExitCode {
    let client = LectureClient::new(server);
    output.info(format!("Fetching languages from {}", client.base_url()));

    match client.languages().await {
        Ok(update) => {
            if output.json {
                let response = LanguagesResponse {
                    languages: update.languages,
                    source: update.source,
                };
                if let Err(e) = output.print(&response) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                if update.languages.is_empty() {
                    output.info("No languages offered yet");
                }
                for lang in &update.languages {
                    println!("{:<8} {}", lang.code, lang.label());
                }
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Failed to fetch languages: {:#}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Current Command
// =============================================================================

pub async fn current_cmd(cmd: CurrentCmd, server: &str, output: &Output) -> ExitCode {
    let client = LectureClient::new(server);

    let current = match client.current().await {
        Ok(current) => current,
        Err(e) => {
            return output.error(
                format!("Failed to fetch subtitles: {:#}", e),
                ExitCode::NetworkError,
            )
        }
    };

    let mut entries: Vec<SubtitleEntry> = match &cmd.language {
        Some(code) => match current.subtitles.get(code) {
            Some(text) => vec![SubtitleEntry {
                language: code.clone(),
                text: text.clone(),
            }],
            None => {
                return output.error(
                    format!("No subtitle for language '{}'", code),
                    ExitCode::LanguageNotOffered,
                )
            }
        },
        None => current
            .subtitles
            .iter()
            .map(|(language, text)| SubtitleEntry {
                language: language.clone(),
                text: text.clone(),
            })
            .collect(),
    };
    entries.sort_by(|a, b| a.language.cmp(&b.language));

    if output.json {
        if let Err(e) = output.print(&entries) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else if cmd.language.is_some() {
        for entry in &entries {
            println!("{}", entry.text);
        }
    } else {
        for entry in &entries {
            println!("[{}] {}", entry.language, entry.text);
        }
    }
    ExitCode::Success
}

// =============================================================================
// Watch Command
// =============================================================================

/// What one channel event meant for a watch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchStep {
    /// Nothing to print
    Pending,
    /// Newly finalized sentences, in order
    Sentences(Vec<String>),
    /// The server's language list does not include the watched language
    NotOffered(Vec<String>),
}

/// Follows one language through the reconciler and yields new sentences
pub struct Watcher {
    language: String,
    reconciler: Reconciler,
}

impl Watcher {
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        let mut reconciler = Reconciler::new();
        reconciler.select_language(Some(language.clone()));
        Self {
            language,
            reconciler,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn feed(&mut self, event: &ServerEvent) -> WatchStep {
        match event {
            ServerEvent::LanguagesUpdate(update) => {
                if update.languages.iter().any(|l| l.code == self.language) {
                    WatchStep::Pending
                } else {
                    WatchStep::NotOffered(update.languages.iter().map(|l| l.code.clone()).collect())
                }
            }
            ServerEvent::SubtitleUpdate(subtitle) => self.subtitle(subtitle),
            _ => WatchStep::Pending,
        }
    }

    fn subtitle(&mut self, subtitle: &SubtitleEvent) -> WatchStep {
        let before = self.reconciler.history().len();
        match self.reconciler.apply(subtitle) {
            Outcome::Appended { .. } => {
                WatchStep::Sentences(self.reconciler.history()[before..].to_vec())
            }
            _ => WatchStep::Pending,
        }
    }
}

pub async fn watch_cmd(
    cmd: WatchCmd,
    server: &str,
    reconnect_delay: Duration,
    output: &Output,
) -> ExitCode {
    if cmd.max == Some(0) {
        return ExitCode::Success;
    }

    let (tx, mut rx) = event::channel();
    let config = ConnectionConfig {
        reconnect_delay,
        ..ConnectionConfig::new(server)
    };
    let connection = match Connection::spawn(config, tx) {
        Ok(connection) => connection,
        Err(e) => return output.error(format!("Cannot connect: {}", e), ExitCode::InvalidArgs),
    };

    let mut watcher = Watcher::new(&cmd.language);
    let mut printed = 0usize;
    output.info(format!("Watching '{}' on {} (Ctrl-C to stop)", cmd.language, server));

    let code = loop {
        let event = tokio::select! {
            event = rx.recv() => event,
            _ = tokio::signal::ctrl_c() => break ExitCode::Success,
        };
        let Some(event) = event else {
            break output.error("Connection closed", ExitCode::NetworkError);
        };

        let server_event = match event {
            AppEvent::Channel(ChannelEvent::Server(server_event)) => server_event,
            AppEvent::Channel(ChannelEvent::Status(status)) => {
                match &status {
                    ConnectionStatus::Error(_) | ConnectionStatus::Disconnected => {
                        log::warn!("{}", status)
                    }
                    _ => log::info!("{}", status),
                }
                continue;
            }
            AppEvent::Speech(_) => continue,
        };

        match watcher.feed(&server_event) {
            WatchStep::Pending => {}
            WatchStep::NotOffered(offered) => {
                break output.error(
                    format!(
                        "Language '{}' is not offered (available: {})",
                        cmd.language,
                        offered.join(", ")
                    ),
                    ExitCode::LanguageNotOffered,
                );
            }
            WatchStep::Sentences(sentences) => {
                for text in sentences {
                    printed += 1;
                    let line = SentenceLine {
                        index: printed,
                        language: cmd.language.clone(),
                        text,
                    };
                    if output.json {
                        if let Err(e) = output.print_line(&line) {
                            log::warn!("Failed to serialize: {}", e);
                        }
                    } else {
                        println!("{}", line.text);
                    }
                    if cmd.max.is_some_and(|max| printed >= max) {
                        break;
                    }
                }
                if cmd.max.is_some_and(|max| printed >= max) {
                    break ExitCode::Success;
                }
            }
        }
    };

    connection.shutdown();
    code
}
