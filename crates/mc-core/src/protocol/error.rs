//! Error type returned by every decoding operation.

use crate::domain::connection::ConnectionState;
use thiserror::Error;

/// Errors that can occur while decoding a packet.
///
/// Every variant aborts the current [`crate::PacketDecoder::decode`] call.  No
/// partially decoded event is ever returned, and the connection state is left
/// exactly as it was before the call.  Callers are expected to drop the
/// connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// `decode` was called with an empty buffer.
    #[error("empty packet")]
    EmptyPacket,

    /// A read needed more bytes than the buffer (or the current frame) holds.
    #[error("truncated input: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// A varint still had its continuation bit set after five bytes.
    #[error("varint is longer than 5 bytes")]
    VarIntTooLong,

    /// String bytes were not valid UTF-8 (or UTF-16 on the legacy path).
    #[error("invalid text encoding: {0}")]
    InvalidEncoding(String),

    /// A length prefix decoded to a negative value.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// The frame's declared length exceeds the bytes that follow it.
    #[error("frame declares {declared} bytes, only {available} available")]
    FrameTooShort { declared: usize, available: usize },

    /// The handshake named a protocol version outside the accepted set.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocol(i32),

    /// The handshake asked for a next state other than Status or Login.
    #[error("invalid next state requested by handshake: {0}")]
    InvalidNextState(i32),

    /// No decoder is registered for this packet id in the current state.
    #[error("unhandled packet id 0x{packet_id:02X} in state {state} ({} payload bytes)", .payload.len())]
    UnhandledPacket {
        state: ConnectionState,
        packet_id: i32,
        /// Unread frame bytes following the packet id, kept for diagnostics.
        payload: Vec<u8>,
    },

    /// The external decryption collaborator rejected a ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),
}
