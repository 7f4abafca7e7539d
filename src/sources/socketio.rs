//! Minimal Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only what the price stream needs: the default namespace, JSON events,
//! and the ping/pong heartbeat. Binary attachments and acknowledgements are
//! not used by the price channel.

use serde::Deserialize;
use serde_json::Value;

/// Engine.IO handshake carried by the open packet.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// A decoded inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0{...}`
    Open(Handshake),
    /// `1`
    Close,
    /// `2`
    Ping,
    /// `3`
    Pong,
    /// `40` / `40{...}`
    Connected,
    /// `41`
    Disconnected,
    /// `42["name", data]`
    Event { name: String, data: Value },
    /// `44{...}`
    ConnectError(String),
    /// Anything else.
    Unknown(String),
}

/// Namespace connect request.
pub const CONNECT: &str = "40";
/// Heartbeat reply.
pub const PONG: &str = "3";

/// Decode one text frame.
pub fn decode(frame: &str) -> Packet {
    let mut chars = frame.chars();
    match chars.next() {
        Some('0') => match serde_json::from_str::<Handshake>(chars.as_str()) {
            Ok(handshake) => Packet::Open(handshake),
            Err(_) => Packet::Unknown(frame.to_string()),
        },
        Some('1') => Packet::Close,
        Some('2') => Packet::Ping,
        Some('3') => Packet::Pong,
        Some('4') => decode_socket(chars.as_str(), frame),
        _ => Packet::Unknown(frame.to_string()),
    }
}

fn decode_socket(body: &str, frame: &str) -> Packet {
    let mut chars = body.chars();
    match chars.next() {
        Some('0') => Packet::Connected,
        Some('1') => Packet::Disconnected,
        Some('2') => decode_event(chars.as_str()).unwrap_or_else(|| Packet::Unknown(frame.to_string())),
        Some('4') => Packet::ConnectError(chars.as_str().to_string()),
        _ => Packet::Unknown(frame.to_string()),
    }
}

fn decode_event(body: &str) -> Option<Packet> {
    // Skip an optional ack id before the JSON array.
    let start = body.find('[')?;
    let args: Vec<Value> = serde_json::from_str(&body[start..]).ok()?;
    let mut args = args.into_iter();
    let name = match args.next()? {
        Value::String(name) => name,
        _ => return None,
    };
    let data = args.next().unwrap_or(Value::Null);
    Some(Packet::Event { name, data })
}

/// Encode an event emit, e.g. `42["subscribePrices"]`.
pub fn encode_event(name: &str, data: Option<&Value>) -> String {
    let args = match data {
        Some(data) => Value::Array(vec![Value::String(name.to_string()), data.clone()]),
        None => Value::Array(vec![Value::String(name.to_string())]),
    };
    format!("42{}", args)
}
