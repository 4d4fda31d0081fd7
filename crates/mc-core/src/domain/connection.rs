//! Connection state machine.
//!
//! Every connection starts in [`ConnectionState::Handshake`].  The first packet
//! a client sends names the protocol version it speaks and the phase it wants
//! next (`1` = Status, `2` = Login).  Nothing else moves the state in the
//! phases this crate handles.

/// Protocol version number negotiated during the handshake.
pub type ProtocolVersion = i32;

/// The phase of one connection's protocol lifecycle.
///
/// The discriminants are the values used on the wire in the handshake's
/// `next_state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ConnectionState {
    #[default]
    Handshake = 0,
    Status = 1,
    Login = 2,
}

impl ConnectionState {
    /// Lower-case name used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Handshake => "handshake",
            ConnectionState::Status => "status",
            ConnectionState::Login => "login",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for ConnectionState {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(ConnectionState::Handshake),
            1 => Ok(ConnectionState::Status),
            2 => Ok(ConnectionState::Login),
            _ => Err(()),
        }
    }
}

/// A state change requested by a successfully decoded handshake.
///
/// The handshake decode routine only *describes* the change; the decoder
/// applies it once the whole packet has decoded without error, so a failure
/// halfway through a handshake leaves the connection untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// Phase the client asked to enter.  Always `Status` or `Login`.
    pub next_state: ConnectionState,
    /// Protocol version the client announced, already checked against the
    /// accepted set.
    pub protocol_version: ProtocolVersion,
}

impl StateTransition {
    /// Builds a transition from the raw `next_state` value of a handshake.
    ///
    /// Returns `None` unless `requested` names the Status or Login phase; a
    /// client can never ask to go back to Handshake.
    pub fn requested(protocol_version: ProtocolVersion, requested: i32) -> Option<Self> {
        match ConnectionState::try_from(requested) {
            Ok(next_state @ (ConnectionState::Status | ConnectionState::Login)) => Some(Self {
                next_state,
                protocol_version,
            }),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
