//! Data structures shared across the client
//!
//! Organized by domain:
//! - **Languages**: the server-announced language set
//! - **Subtitles**: subtitle events pushed by the lecture server
//! - **Speech**: synthesized audio payloads
//! - **Connection**: channel status shown in the status bar

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Language Models
// =============================================================================

/// A language offered by the lecture server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            flag: None,
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    /// Label shown in the language selector
    pub fn label(&self) -> String {
        match &self.flag {
            Some(flag) if !flag.is_empty() => format!("{} {}", flag, self.name),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.code)
    }
}

/// Wire shape of one language entry (`{name, flag?}` keyed by code)
#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: String,
    #[serde(default)]
    flag: Option<String>,
}

/// Source language description attached to server payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLanguage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// Payload of `languages_update` and `GET /api/languages`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LanguagesUpdate {
    #[serde(default, deserialize_with = "deserialize_language_map")]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub source: Option<SourceLanguage>,
}

/// Deserialize `{code: {name, flag?}}` into languages, keeping announced order
fn deserialize_language_map<'de, D>(deserializer: D) -> Result<Vec<Language>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LanguageMapVisitor;

    impl<'de> Visitor<'de> for LanguageMapVisitor {
        type Value = Vec<Language>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of language code to {name, flag}")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut languages = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((code, info)) = map.next_entry::<String, LanguageInfo>()? {
                // Later duplicates replace earlier ones, as a keyed map would
                languages.retain(|l: &Language| l.code != code);
                languages.push(Language {
                    code,
                    name: info.name,
                    flag: info.flag,
                });
            }
            Ok(languages)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(LanguageMapVisitor)
}

// =============================================================================
// Subtitle Models
// =============================================================================

/// Kind of subtitle event pushed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleKind {
    /// Speech recognized, translation in progress
    Processing,
    /// Partial, still-updating translation
    Realtime,
    /// Completed translation segment
    Final,
    /// Snapshot of the latest subtitles, sent once on connect
    Current,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SubtitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubtitleKind::Processing => "processing",
            SubtitleKind::Realtime => "realtime",
            SubtitleKind::Final => "final",
            SubtitleKind::Current => "current",
            SubtitleKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Payload of `subtitle_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEvent {
    #[serde(rename = "type")]
    pub kind: SubtitleKind,
    /// Language code to subtitle text
    #[serde(default, deserialize_with = "deserialize_text_map")]
    pub data: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_lang: Option<SourceLanguage>,
}

impl SubtitleEvent {
    pub fn new(kind: SubtitleKind) -> Self {
        Self {
            kind,
            data: HashMap::new(),
            source_lang: None,
        }
    }

    pub fn with_text(mut self, code: impl Into<String>, text: impl Into<String>) -> Self {
        self.data.insert(code.into(), text.into());
        self
    }

    /// Non-empty text for a language, if the event carries one
    pub fn text_for(&self, code: &str) -> Option<&str> {
        self.data
            .get(code)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Accept `data` as a map of strings, ignoring non-string values and
/// treating `null` or a non-map as empty
fn deserialize_text_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let map = match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    };
    Ok(map)
}

/// Payload of `GET /api/current`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentSubtitles {
    #[serde(default)]
    pub subtitles: HashMap<String, String>,
    #[serde(default)]
    pub source: Option<SourceLanguage>,
}

// =============================================================================
// Speech Models
// =============================================================================

/// Payload of `tts_audio`: base64-encoded synthesized audio
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TtsAudio {
    pub audio: String,
}

/// Payload of `tts_error`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TtsError {
    #[serde(default)]
    pub error: String,
}

// =============================================================================
// Connection Models
// =============================================================================

/// Channel connection state as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Dialing the server
    #[default]
    Connecting,
    Connected,
    Disconnected,
    /// Transport-level failure, retried automatically
    Error(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Error(_) => "Connection Error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Error(msg) => write!(f, "{}: {}", self.label(), msg),
            _ => write!(f, "{}", self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_update_keeps_announced_order() {
        let json = r#"{
            "languages": {
                "ko": {"name": "Korean", "flag": "🇰🇷"},
                "en": {"name": "English", "flag": "🇺🇸"},
                "ja": {"name": "Japanese"}
            },
            "source": {"name": "Korean", "flag": "🇰🇷"}
        }"#;

        let update: LanguagesUpdate = serde_json::from_str(json).unwrap();
        let codes: Vec<&str> = update.languages.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["ko", "en", "ja"]);
        assert_eq!(update.languages[2].flag, None);
        assert_eq!(update.source.unwrap().name.as_deref(), Some("Korean"));
    }

    #[test]
    fn test_languages_update_missing_map() {
        let update: LanguagesUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.languages.is_empty());

        let update: LanguagesUpdate = serde_json::from_str(r#"{"languages": null}"#).unwrap();
        assert!(update.languages.is_empty());
    }

    #[test]
    fn test_language_label() {
        let lang = Language::new("en", "English").with_flag("🇺🇸");
        assert_eq!(lang.label(), "🇺🇸 English");
        assert_eq!(Language::new("de", "German").label(), "German");
    }

    #[test]
    fn test_subtitle_event_parse() {
        let json = r#"{"type": "final", "data": {"en": "Hello.", "ko": "안녕하세요."}, "source_lang": {}}"#;
        let event: SubtitleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, SubtitleKind::Final);
        assert_eq!(event.text_for("en"), Some("Hello."));
        assert_eq!(event.text_for("fr"), None);
    }

    #[test]
    fn test_subtitle_event_unknown_kind_and_loose_data() {
        let json = r#"{"type": "recognized", "data": {"en": 5, "ko": "네"}}"#;
        let event: SubtitleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, SubtitleKind::Unknown);
        assert_eq!(event.data.len(), 1);

        let json = r#"{"type": "processing", "data": {}}"#;
        let event: SubtitleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, SubtitleKind::Processing);
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_blank_text_is_absent() {
        let event = SubtitleEvent::new(SubtitleKind::Realtime).with_text("en", "   ");
        assert_eq!(event.text_for("en"), None);
    }

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionStatus::Error("refused".into()).to_string(),
            "Connection Error: refused"
        );
        assert!(!ConnectionStatus::default().is_connected());
    }
}
