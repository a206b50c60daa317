//! CLI - Command Line Interface for lecture-lens
//!
//! Every subcommand is scriptable and JSON-parseable; running without a
//! subcommand launches the interactive TUI.
//!
//! # Examples
//!
//! ```bash
//! # Which languages is the lecture offered in?
//! lecture-lens languages --json
//!
//! # Current subtitle in English
//! lecture-lens current --language en
//!
//! # Follow finalized sentences as JSON lines
//! lecture-lens watch --language ja --json --max 10
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{Language, SourceLanguage};
use crate::speech::SpeechKind;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Requested language is not offered by the server
    LanguageNotOffered = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// lecture-lens - live lecture subtitles in your terminal
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scripting.
#[derive(Parser, Debug)]
#[command(
    name = "lecture-lens",
    version,
    about = "Live lecture subtitles and translation in the terminal",
    long_about = "Audience client for a live lecture subtitle server: follow the \
                  lecture in your language and optionally have it read aloud.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  lecture-lens                              Launch interactive TUI\n\
                  lecture-lens -l en --speech local         TUI in English, local voice\n\
                  lecture-lens languages                    List offered languages\n\
                  lecture-lens watch -l ja --json           Stream final sentences"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Lecture server URL (overrides config and LECTURE_LENS_SERVER)
    #[arg(long, short = 's', global = true)]
    pub server: Option<String>,

    /// Language to select once the server offers it (TUI)
    #[arg(long, short = 'l')]
    pub language: Option<String>,

    /// Speech backend (TUI)
    #[arg(long, value_enum)]
    pub speech: Option<SpeechKind>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the languages the lecture is offered in
    #[command(visible_alias = "ls")]
    Languages(LanguagesCmd),

    /// Show the current subtitle snapshot
    Current(CurrentCmd),

    /// Follow finalized sentences for one language
    #[command(visible_alias = "w")]
    Watch(WatchCmd),
}

#[derive(Args, Debug)]
pub struct LanguagesCmd {}

#[derive(Args, Debug)]
pub struct CurrentCmd {
    /// Only this language (default: all)
    #[arg(long, short = 'l')]
    pub language: Option<String>,
}

#[derive(Args, Debug)]
pub struct WatchCmd {
    /// Language to follow
    #[arg(long, short = 'l')]
    pub language: String,

    /// Stop after this many sentences
    #[arg(long, short = 'n')]
    pub max: Option<usize>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// `languages` response
#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLanguage>,
}

/// One language's entry in a `current` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleEntry {
    pub language: String,
    pub text: String,
}

/// One finalized sentence printed by `watch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceLine {
    pub index: usize,
    pub language: String,
    pub text: String,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data wrapped in the JSON envelope
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let output = JsonOutput::success(data);
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Print one compact JSON value per line
    pub fn print_line<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(data)?);
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Language Code Validation
// =============================================================================

/// Validate a language code (`en`, `zh-CN`, `pt_BR`)
pub fn validate_language_code(code: &str) -> Result<&str, &'static str> {
    let valid = (2..=10).contains(&code.len())
        && code.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(code)
    } else {
        Err("Invalid language code (expected e.g. en, ko, zh-CN)")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_tui_mode() {
        let cli = Cli::parse_from::<_, &str>([]);
        assert!(!cli.is_cli_mode());
    }

    #[test]
    fn test_tui_flags() {
        let cli = Cli::parse_from([
            "lecture-lens",
            "--server",
            "http://10.0.0.2:5000",
            "-l",
            "ja",
            "--speech",
            "local",
        ]);
        assert!(!cli.is_cli_mode());
        assert_eq!(cli.server.as_deref(), Some("http://10.0.0.2:5000"));
        assert_eq!(cli.language.as_deref(), Some("ja"));
        assert_eq!(cli.speech, Some(SpeechKind::Local));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lecture-lens", "languages", "--json", "-q", "-s", "http://x"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(cli.server.as_deref(), Some("http://x"));
        assert!(matches!(cli.command, Some(Command::Languages(_))));
    }

    #[test]
    fn test_watch_command() {
        let cli = Cli::parse_from(["lecture-lens", "watch", "--language", "ko", "--max", "3"]);
        match cli.command {
            Some(Command::Watch(cmd)) => {
                assert_eq!(cmd.language, "ko");
                assert_eq!(cmd.max, Some(3));
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_watch_requires_language() {
        assert!(Cli::try_parse_from(["lecture-lens", "watch"]).is_err());
    }

    #[test]
    fn test_current_language_optional() {
        let cli = Cli::parse_from(["lecture-lens", "current"]);
        match cli.command {
            Some(Command::Current(cmd)) => assert!(cmd.language.is_none()),
            _ => panic!("Expected Current command"),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::LanguageNotOffered), 4);
    }

    #[test]
    fn test_validate_language_code() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("zh-CN").is_ok());
        assert!(validate_language_code("pt_BR").is_ok());
        assert!(validate_language_code("e").is_err());
        assert!(validate_language_code("1en").is_err());
        assert!(validate_language_code("en us").is_err());
    }

    #[test]
    fn test_json_error_envelope() {
        let output = JsonOutput::<()>::error_msg("boom", ExitCode::NetworkError);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["exit_code"], 3);
        assert!(json.get("data").is_none());
    }
}
