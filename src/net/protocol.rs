//! Socket.IO wire codec
//!
//! The lecture server speaks Socket.IO v5 over Engine.IO v4. Over a
//! WebSocket transport every frame is a text packet whose first character is
//! the Engine.IO type; message packets (`4`) carry a Socket.IO packet whose
//! first character is the Socket.IO type.
//!
//! Only the default namespace and text (non-binary) events are supported.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{LanguagesUpdate, SubtitleEvent, TtsAudio, TtsError};

/// Engine.IO pong frame, sent in reply to a server ping
pub const PONG: &str = "3";

/// Socket.IO connect request for the default namespace
pub const CONNECT: &str = "40";

/// Errors decoding channel frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty frame")]
    Empty,
    #[error("Unknown packet type in frame: {0}")]
    UnknownType(String),
    #[error("Malformed event packet: {0}")]
    MalformedEvent(String),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine.IO handshake data
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// A decoded channel frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open (`0{...}`)
    Open(Handshake),
    /// Engine.IO close (`1`)
    Close,
    /// Engine.IO ping (`2`)
    Ping,
    /// Engine.IO pong (`3`)
    Pong,
    /// Engine.IO noop (`6`)
    Noop,
    /// Socket.IO namespace connected (`40{...}`)
    Connect,
    /// Socket.IO namespace disconnected by the server (`41`)
    Disconnect,
    /// Socket.IO event (`42["name", payload]`)
    Event { name: String, payload: Value },
    /// Socket.IO connect refused (`44{...}`)
    ConnectError(String),
}

/// Decode one text frame
pub fn decode(frame: &str) -> Result<Packet, ProtocolError> {
    let mut chars = frame.chars();
    let engine = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match engine {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '6' => Ok(Packet::Noop),
        _ => Err(ProtocolError::UnknownType(frame.to_string())),
    }
}

fn decode_message(body: &str) -> Result<Packet, ProtocolError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = strip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        _ => Err(ProtocolError::UnknownType(format!("4{}", body))),
    }
}

/// Drop a leading `/namespace,` if present
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Packet, ProtocolError> {
    // Optional ack id precedes the JSON array
    let json_start = rest
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ProtocolError::MalformedEvent(rest.to_string()))?;

    let value: Value = serde_json::from_str(&rest[json_start..])?;
    let mut items = match value {
        Value::Array(items) => items.into_iter(),
        _ => return Err(ProtocolError::MalformedEvent(rest.to_string())),
    };

    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(ProtocolError::MalformedEvent(rest.to_string())),
    };
    let payload = items.next().unwrap_or(Value::Null);

    Ok(Packet::Event { name, payload })
}

/// Encode a Socket.IO event frame
pub fn encode_event(name: &str, payload: Option<&Value>) -> String {
    let array = match payload {
        Some(payload) => json!([name, payload]),
        None => json!([name]),
    };
    format!("42{}", array)
}

// =============================================================================
// Typed Events
// =============================================================================

/// Events the client consumes from the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    LanguagesUpdate(LanguagesUpdate),
    SubtitleUpdate(SubtitleEvent),
    TtsAudio(TtsAudio),
    TtsError(TtsError),
}

impl ServerEvent {
    /// Interpret a named event. Returns `Ok(None)` for events this client
    /// does not consume.
    pub fn from_event(name: &str, payload: Value) -> Result<Option<Self>, ProtocolError> {
        let event = match name {
            "languages_update" => ServerEvent::LanguagesUpdate(serde_json::from_value(payload)?),
            "subtitle_update" => ServerEvent::SubtitleUpdate(serde_json::from_value(payload)?),
            "tts_audio" => ServerEvent::TtsAudio(serde_json::from_value(payload)?),
            "tts_error" => ServerEvent::TtsError(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Events the client emits on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Ask for the current language list
    RequestLanguages,
    /// Ask the server to synthesize speech
    RequestTts { text: String, lang: String, speed: f32 },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RequestLanguages => "request_languages",
            ClientEvent::RequestTts { .. } => "request_tts",
        }
    }

    /// Encode as a Socket.IO event frame
    pub fn encode(&self) -> String {
        match self {
            ClientEvent::RequestLanguages => encode_event(self.name(), None),
            ClientEvent::RequestTts { text, lang, speed } => {
                let payload = json!({ "text": text, "lang": lang, "speed": speed });
                encode_event(self.name(), Some(&payload))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubtitleKind;

    #[test]
    fn test_decode_open() {
        let frame = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match decode(frame).unwrap() {
            Packet::Open(hs) => {
                assert_eq!(hs.sid, "abc");
                assert_eq!(hs.ping_interval, 25000);
                assert_eq!(hs.ping_timeout, 20000);
            }
            other => panic!("Expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_control_frames() {
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("3").unwrap(), Packet::Pong);
        assert_eq!(decode("1").unwrap(), Packet::Close);
        assert_eq!(decode("6").unwrap(), Packet::Noop);
        assert_eq!(decode(r#"40{"sid":"xyz"}"#).unwrap(), Packet::Connect);
        assert_eq!(decode("41").unwrap(), Packet::Disconnect);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode(""), Err(ProtocolError::Empty)));
        assert!(matches!(decode("9"), Err(ProtocolError::UnknownType(_))));
        assert!(matches!(decode("42{}"), Err(ProtocolError::MalformedEvent(_))));
        assert!(matches!(decode("42[1]"), Err(ProtocolError::MalformedEvent(_))));
    }

    #[test]
    fn test_decode_connect_error() {
        let packet = decode(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet, Packet::ConnectError("Not authorized".into()));
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = decode(r#"42/audience,7["subtitle_update",{"type":"final","data":{}}]"#).unwrap();
        match packet {
            Packet::Event { name, payload } => {
                assert_eq!(name, "subtitle_update");
                assert_eq!(payload["type"], "final");
            }
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_without_payload() {
        let packet = decode(r#"42["request_languages"]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "request_languages".into(),
                payload: Value::Null
            }
        );
    }

    #[test]
    fn test_server_event_subtitle() {
        let packet = decode(
            r#"42["subtitle_update",{"type":"realtime","data":{"en":"Hello wor"},"source_lang":{"name":"Korean"}}]"#,
        )
        .unwrap();
        let Packet::Event { name, payload } = packet else {
            panic!("Expected event");
        };
        match ServerEvent::from_event(&name, payload).unwrap() {
            Some(ServerEvent::SubtitleUpdate(ev)) => {
                assert_eq!(ev.kind, SubtitleKind::Realtime);
                assert_eq!(ev.text_for("en"), Some("Hello wor"));
            }
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_server_event_unconsumed() {
        let result = ServerEvent::from_event("client_count", json!({"count": 3})).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_server_event_tts() {
        let audio = ServerEvent::from_event("tts_audio", json!({"audio": "AAAA"})).unwrap();
        assert_eq!(
            audio,
            Some(ServerEvent::TtsAudio(TtsAudio {
                audio: "AAAA".into()
            }))
        );

        let error = ServerEvent::from_event("tts_error", json!({"error": "quota"})).unwrap();
        assert_eq!(
            error,
            Some(ServerEvent::TtsError(TtsError {
                error: "quota".into()
            }))
        );
    }

    #[test]
    fn test_encode_client_events() {
        assert_eq!(
            ClientEvent::RequestLanguages.encode(),
            r#"42["request_languages"]"#
        );

        let frame = ClientEvent::RequestTts {
            text: "Hello.".into(),
            lang: "en".into(),
            speed: 1.5,
        }
        .encode();
        assert!(frame.starts_with(r#"42["request_tts","#));

        let Packet::Event { name, payload } = decode(&frame).unwrap() else {
            panic!("Expected event");
        };
        assert_eq!(name, "request_tts");
        assert_eq!(payload["text"], "Hello.");
        assert_eq!(payload["lang"], "en");
        assert_eq!(payload["speed"], 1.5);
    }
}
