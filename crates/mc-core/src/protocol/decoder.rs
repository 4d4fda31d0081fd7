//! Per-connection packet decoder.
//!
//! [`PacketDecoder`] is the entry point of the crate.  It owns the connection
//! state and negotiated protocol version, picks the legacy or framed path for
//! each buffer, and applies the state transition a handshake produces.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use mc_core::{ConnectionState, DecoderConfig, DecryptError, PacketDecoder, SecretDecryptor};
//!
//! struct NoKey;
//! impl SecretDecryptor for NoKey {
//!     fn decrypt(&self, _ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
//!         Err(DecryptError::new("no key"))
//!     }
//! }
//!
//! let mut decoder = PacketDecoder::new(DecoderConfig::accepting([47]), Arc::new(NoKey));
//!
//! // [len=15][id=0][protocol=47]["localhost"][port=25565][next=1]
//! let bytes = [
//!     15, 0, 47, 9, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63, 0xDD, 1,
//! ];
//! let (rest, event) = decoder.decode(&bytes).unwrap();
//! assert!(rest.is_empty());
//! assert_eq!(event.kind(), "handshake");
//! assert_eq!(decoder.state(), ConnectionState::Status);
//! assert_eq!(decoder.protocol_version(), Some(47));
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::connection::{ConnectionState, ProtocolVersion, StateTransition};
use crate::protocol::cursor::Cursor;
use crate::protocol::dispatch::{dispatch, DispatchContext, Dispatched};
use crate::protocol::error::DecodeError;
use crate::protocol::events::Event;
use crate::protocol::frame::read_frame;
use crate::protocol::legacy::{decode_legacy_probe, is_legacy_probe};

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Failure reported by a [`SecretDecryptor`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecryptError(pub String);

impl DecryptError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Decrypts the ciphertexts a client sends in its encryption response.
///
/// Implementations hold the server's private key; the decoder never sees it.
/// One implementation is typically shared by every connection, hence the
/// `Send + Sync` bound.
#[cfg_attr(test, mockall::automock)]
pub trait SecretDecryptor: Send + Sync {
    /// Decrypts one ciphertext block with the server key.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError>;
}

/// Settings a decoder needs from the surrounding server.
///
/// Passed in explicitly at construction, so decoders with different settings
/// can coexist in one process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Protocol versions a handshake may announce.  Any other version fails
    /// with [`DecodeError::UnsupportedProtocol`].
    #[serde(default)]
    pub accepted_protocols: BTreeSet<ProtocolVersion>,
}

impl DecoderConfig {
    /// Builds a config accepting exactly the given versions.
    pub fn accepting(versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        Self {
            accepted_protocols: versions.into_iter().collect(),
        }
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────────

/// Decodes the serverbound bytes of one connection.
///
/// Create one decoder per connection and keep it for the connection's
/// lifetime: the meaning of a packet id depends on the state earlier packets
/// put the connection in.  `decode` takes `&mut self`, so a decoder can never
/// be driven from two places at once.
pub struct PacketDecoder {
    config: DecoderConfig,
    decryptor: Arc<dyn SecretDecryptor>,
    state: ConnectionState,
    protocol_version: Option<ProtocolVersion>,
}

impl std::fmt::Debug for PacketDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDecoder")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}

impl PacketDecoder {
    /// Creates a decoder for a fresh connection, in the Handshake state with
    /// no protocol version negotiated.
    pub fn new(config: DecoderConfig, decryptor: Arc<dyn SecretDecryptor>) -> Self {
        Self {
            config,
            decryptor,
            state: ConnectionState::Handshake,
            protocol_version: None,
        }
    }

    /// Creates a decoder for a connection whose handshake was already
    /// processed elsewhere.
    pub fn resume(
        config: DecoderConfig,
        decryptor: Arc<dyn SecretDecryptor>,
        state: ConnectionState,
        protocol_version: ProtocolVersion,
    ) -> Self {
        Self {
            state,
            protocol_version: Some(protocol_version),
            ..Self::new(config, decryptor)
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Protocol version negotiated by the last successful handshake.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol_version
    }

    /// Decodes the first packet in `buf`.
    ///
    /// Returns the bytes following that packet together with its event.  For a
    /// framed packet the leftover always starts at the declared frame end,
    /// even if the payload was not read in full.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`].  On error the connection state and protocol
    /// version are unchanged and `buf` should be discarded along with the
    /// connection.
    pub fn decode<'b>(&mut self, buf: &'b [u8]) -> Result<(&'b [u8], Event), DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::EmptyPacket);
        }

        let mut cursor = Cursor::new(buf);

        // Also matches a framed packet of exactly 254 bytes, whose length
        // prefix begins with 0xFE.
        if is_legacy_probe(buf) {
            let event = decode_legacy_probe(&mut cursor)?;
            debug!(consumed = cursor.position(), "decoded legacy probe");
            return Ok((cursor.rest(), event));
        }

        let frame = read_frame(&mut cursor)?;
        let packet_id = frame.packet_id;
        let frame_end = frame.end;

        let ctx = DispatchContext {
            accepted_protocols: &self.config.accepted_protocols,
            decryptor: self.decryptor.as_ref(),
        };
        let Dispatched { event, transition } = dispatch(self.state, frame, &ctx)?;
        trace!(
            state = %self.state,
            packet_id,
            kind = event.kind(),
            "decoded packet"
        );

        // Skip whatever the routine left unread in the frame.
        cursor.seek(frame_end)?;

        if let Some(transition) = transition {
            self.apply(transition);
        }
        Ok((cursor.rest(), event))
    }

    /// Decodes every packet in `buf`, feeding each leftover back in.
    ///
    /// # Errors
    ///
    /// Stops at the first failing packet and returns its error.  Transitions
    /// made by packets before it remain applied.
    pub fn decode_all(&mut self, mut buf: &[u8]) -> Result<Vec<Event>, DecodeError> {
        let mut events = Vec::new();
        while !buf.is_empty() {
            let (rest, event) = self.decode(buf)?;
            events.push(event);
            buf = rest;
        }
        Ok(events)
    }

    fn apply(&mut self, transition: StateTransition) {
        debug!(
            from = %self.state,
            to = %transition.next_state,
            protocol_version = transition.protocol_version,
            "connection state advanced"
        );
        self.state = transition.next_state;
        self.protocol_version = Some(transition.protocol_version);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
