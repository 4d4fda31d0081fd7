//! Events produced by the decoder.
//!
//! One event is produced per decoded packet.  Events are plain immutable
//! records; they carry the decoded field values and a string tag naming their
//! kind, which downstream consumers use for routing and logging.

use serde::Serialize;

/// A block coordinate unpacked from the protocol's 64-bit position encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// A decoded serverbound packet.
///
/// Serializes with an internal `kind` field equal to [`Event::kind`], e.g.
/// `{"kind":"ping","payload":7}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Event {
    /// Handshake (state Handshake, id 0x00).  Also moves the connection to the
    /// requested state.
    #[serde(rename = "handshake")]
    Handshake { hostname: String, port: u16 },

    /// Status request (state Status, id 0x00).  Has no payload.
    #[serde(rename = "status")]
    Status,

    /// Status ping (state Status, id 0x01).  The payload is echoed back by the
    /// server in its pong.
    #[serde(rename = "ping")]
    Ping { payload: i64 },

    /// Login start (state Login, id 0x00).
    #[serde(rename = "login_start")]
    LoginStart { username: String },

    /// Encryption response (state Login, id 0x01), already decrypted.
    #[serde(rename = "login_encryption")]
    ConfirmEncryption {
        secret: Vec<u8>,
        verify_token: Vec<u8>,
    },

    /// Unframed server-list probe sent by pre-netty clients.
    #[serde(rename = "connect_16")]
    LegacyProbe {
        protocol: u8,
        hostname: String,
        port: i32,
    },
}

impl Event {
    /// The string tag identifying this event's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Handshake { .. } => "handshake",
            Event::Status => "status",
            Event::Ping { .. } => "ping",
            Event::LoginStart { .. } => "login_start",
            Event::ConfirmEncryption { .. } => "login_encryption",
            Event::LegacyProbe { .. } => "connect_16",
        }
    }
}
