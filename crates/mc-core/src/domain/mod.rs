//! Domain entities for the connection lifecycle.
//!
//! This module contains the protocol state machine with no byte-level parsing
//! and no infrastructure dependencies.  The decoder in [`crate::protocol`]
//! depends on it; it never depends on the decoder.

/// Connection phase and the transitions a handshake can request.
///
/// See [`connection::ConnectionState`] for the main type.
pub mod connection;
