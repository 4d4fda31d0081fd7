//! # mc-core
//!
//! Decoding library for the serverbound side of the game protocol: turns raw
//! bytes received on a connection into typed events, and tracks that
//! connection's protocol state through the handshake, status, and login phases.
//!
//! This crate has zero dependencies on sockets, async runtimes, or key storage.
//! The surrounding server feeds it byte buffers and supplies the two things it
//! cannot know on its own: which protocol versions are accepted, and how to
//! decrypt the login shared secret.
//!
//! # Architecture overview (for beginners)
//!
//! A client talking to the server goes through a small state machine:
//!
//! ```text
//!             handshake(next = 1)
//! Handshake ───────────────────────▶ Status   (server list ping)
//!     │
//!     │       handshake(next = 2)
//!     └───────────────────────────▶ Login    (username, encryption)
//! ```
//!
//! The same packet id means different things in different states (id `0` is a
//! handshake, a status request, or a login start), so decoding always needs to
//! know the connection's current state.  That is why one [`PacketDecoder`] is
//! created per connection and kept for the connection's lifetime.
//!
//! - **`protocol`** – How bytes are read.  A [`protocol::cursor::Cursor`] reads
//!   primitive values, the framer splits the stream into length-prefixed
//!   packets, and the dispatcher picks a decode routine per state and packet id.
//!   Very old clients skip framing entirely and send a fixed "legacy probe";
//!   that path lives in `protocol::legacy`.
//!
//! - **`domain`** – The connection state machine itself: the
//!   [`ConnectionState`] enum and the [`StateTransition`] a successful handshake
//!   produces.

// Rust will look for each module in a subdirectory with the same name
// (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mc_core::PacketDecoder` instead of `mc_core::protocol::decoder::PacketDecoder`.
pub use domain::connection::{ConnectionState, ProtocolVersion, StateTransition};
pub use protocol::decoder::{DecoderConfig, DecryptError, PacketDecoder, SecretDecryptor};
pub use protocol::error::DecodeError;
pub use protocol::events::{BlockPosition, Event};
