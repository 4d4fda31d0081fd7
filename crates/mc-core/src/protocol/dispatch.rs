//! Protocol state dispatcher.
//!
//! Packet ids are only unique within a connection state, so the decode routine
//! is chosen by the `(state, packet_id)` pair:
//!
//! | State     | Id   | Routine                | Event                |
//! |-----------|------|------------------------|----------------------|
//! | Handshake | 0x00 | [`decode_handshake`]   | `Handshake`          |
//! | Status    | 0x00 | [`decode_status`]      | `Status`             |
//! | Status    | 0x01 | [`decode_ping`]        | `Ping`               |
//! | Login     | 0x00 | [`decode_login_start`] | `LoginStart`         |
//! | Login     | 0x01 | [`decode_encryption`]  | `ConfirmEncryption`  |
//!
//! Any other pair is reported as [`DecodeError::UnhandledPacket`].
//!
//! Routines never touch the decoder's state.  The handshake routine returns a
//! [`StateTransition`] in its [`Dispatched`] result and the decoder applies it.

use std::collections::BTreeSet;

use crate::domain::connection::{ConnectionState, ProtocolVersion, StateTransition};
use crate::protocol::cursor::Cursor;
use crate::protocol::decoder::SecretDecryptor;
use crate::protocol::error::DecodeError;
use crate::protocol::events::Event;
use crate::protocol::frame::Frame;

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub event: Event,
    /// State change to apply once decoding has succeeded.  Only handshakes
    /// produce one.
    pub transition: Option<StateTransition>,
}

impl From<Event> for Dispatched {
    fn from(event: Event) -> Self {
        Self {
            event,
            transition: None,
        }
    }
}

/// Collaborators a decode routine may consult.
pub struct DispatchContext<'c> {
    pub accepted_protocols: &'c BTreeSet<ProtocolVersion>,
    pub decryptor: &'c dyn SecretDecryptor,
}

type DecodeFn = fn(&mut Cursor<'_>, &DispatchContext<'_>) -> Result<Dispatched, DecodeError>;

/// Looks up the decode routine for a packet id in the given state.
fn routine_for(state: ConnectionState, packet_id: i32) -> Option<DecodeFn> {
    let routine: DecodeFn = match (state, packet_id) {
        (ConnectionState::Handshake, 0x00) => decode_handshake,
        (ConnectionState::Status, 0x00) => decode_status,
        (ConnectionState::Status, 0x01) => decode_ping,
        (ConnectionState::Login, 0x00) => decode_login_start,
        (ConnectionState::Login, 0x01) => decode_encryption,
        _ => return None,
    };
    Some(routine)
}

/// Decodes the payload of `frame` according to the connection `state`.
///
/// # Errors
///
/// Returns [`DecodeError::UnhandledPacket`] if no routine is registered for
/// the pair, or whatever error the selected routine produces.
pub fn dispatch(
    state: ConnectionState,
    frame: Frame<'_>,
    ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    let Frame {
        packet_id,
        mut payload,
        ..
    } = frame;

    match routine_for(state, packet_id) {
        Some(routine) => routine(&mut payload, ctx),
        None => Err(DecodeError::UnhandledPacket {
            state,
            packet_id,
            payload: payload.rest().to_vec(),
        }),
    }
}

// ── Decode routines ───────────────────────────────────────────────────────────

/// Handshake: `[protocol: varint][hostname: string][port: u16][next: varint]`.
///
/// The protocol version is checked before anything else is read.
pub fn decode_handshake(
    payload: &mut Cursor<'_>,
    ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    let protocol_version = payload.read_varint()?;
    if !ctx.accepted_protocols.contains(&protocol_version) {
        return Err(DecodeError::UnsupportedProtocol(protocol_version));
    }

    let hostname = payload.read_string()?;
    let port = payload.read_u16()?;
    let requested = payload.read_varint()?;
    let transition = StateTransition::requested(protocol_version, requested)
        .ok_or(DecodeError::InvalidNextState(requested))?;

    Ok(Dispatched {
        event: Event::Handshake { hostname, port },
        transition: Some(transition),
    })
}

/// Status request: empty payload.
pub fn decode_status(
    _payload: &mut Cursor<'_>,
    _ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    Ok(Event::Status.into())
}

/// Ping: `[payload: i64]`.
pub fn decode_ping(
    payload: &mut Cursor<'_>,
    _ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    let payload = payload.read_i64()?;
    Ok(Event::Ping { payload }.into())
}

/// Login start: `[username: string]`.
pub fn decode_login_start(
    payload: &mut Cursor<'_>,
    _ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    let username = payload.read_string()?;
    Ok(Event::LoginStart { username }.into())
}

/// Encryption response: two varint-prefixed ciphertexts (shared secret, then
/// verify token), each decrypted with the server key.
pub fn decode_encryption(
    payload: &mut Cursor<'_>,
    ctx: &DispatchContext<'_>,
) -> Result<Dispatched, DecodeError> {
    let encrypted_secret = payload.read_byte_array()?;
    let encrypted_token = payload.read_byte_array()?;

    let secret = decrypt(ctx, encrypted_secret)?;
    let verify_token = decrypt(ctx, encrypted_token)?;

    Ok(Event::ConfirmEncryption {
        secret,
        verify_token,
    }
    .into())
}

fn decrypt(ctx: &DispatchContext<'_>, ciphertext: &[u8]) -> Result<Vec<u8>, DecodeError> {
    ctx.decryptor
        .decrypt(ciphertext)
        .map_err(|e| DecodeError::Decryption(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decoder::{DecryptError, MockSecretDecryptor};
    use crate::protocol::frame::read_frame;
    use crate::protocol::test_support::{
        encode_byte_array, encode_string, encode_varint, frame, handshake_payload,
    };

    fn accepted() -> BTreeSet<ProtocolVersion> {
        [47, 340].into_iter().collect()
    }

    fn run(
        state: ConnectionState,
        bytes: &[u8],
        decryptor: &MockSecretDecryptor,
    ) -> Result<Dispatched, DecodeError> {
        let accepted = accepted();
        let ctx = DispatchContext {
            accepted_protocols: &accepted,
            decryptor,
        };
        let frame = read_frame(&mut Cursor::new(bytes))?;
        dispatch(state, frame, &ctx)
    }

    fn unused_decryptor() -> MockSecretDecryptor {
        let mut decryptor = MockSecretDecryptor::new();
        decryptor.expect_decrypt().never();
        decryptor
    }

    // ── Handshake ─────────────────────────────────────────────────────────────

    #[test]
    fn test_handshake_to_login_returns_transition() {
        let bytes = frame(0x00, &handshake_payload(47, "localhost", 25565, 2));
        let dispatched = run(ConnectionState::Handshake, &bytes, &unused_decryptor()).unwrap();

        assert_eq!(
            dispatched.event,
            Event::Handshake {
                hostname: "localhost".to_string(),
                port: 25565,
            }
        );
        assert_eq!(
            dispatched.transition,
            Some(StateTransition {
                next_state: ConnectionState::Login,
                protocol_version: 47,
            })
        );
    }

    #[test]
    fn test_handshake_to_status() {
        let bytes = frame(0x00, &handshake_payload(340, "mc.local", 25566, 1));
        let dispatched = run(ConnectionState::Handshake, &bytes, &unused_decryptor()).unwrap();
        let transition = dispatched.transition.expect("handshake must transition");
        assert_eq!(transition.next_state, ConnectionState::Status);
        assert_eq!(transition.protocol_version, 340);
    }

    #[test]
    fn test_handshake_with_unaccepted_protocol_fails_before_reading_hostname() {
        // Hostname bytes are garbage; the version check must fire first.
        let mut payload = encode_varint(5);
        payload.extend_from_slice(&[0x7F, 0xFF]);
        let bytes = frame(0x00, &payload);
        let result = run(ConnectionState::Handshake, &bytes, &unused_decryptor());
        assert_eq!(result, Err(DecodeError::UnsupportedProtocol(5)));
    }

    #[test]
    fn test_handshake_with_invalid_next_state_fails() {
        let bytes = frame(0x00, &handshake_payload(47, "localhost", 25565, 3));
        let result = run(ConnectionState::Handshake, &bytes, &unused_decryptor());
        assert_eq!(result, Err(DecodeError::InvalidNextState(3)));
    }

    #[test]
    fn test_handshake_missing_port_is_truncated() {
        let mut payload = encode_varint(47);
        payload.extend_from_slice(&encode_string("localhost"));
        let bytes = frame(0x00, &payload);
        let result = run(ConnectionState::Handshake, &bytes, &unused_decryptor());
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    // ── Status ────────────────────────────────────────────────────────────────

    #[test]
    fn test_status_request_has_no_transition() {
        let bytes = frame(0x00, &[]);
        let dispatched = run(ConnectionState::Status, &bytes, &unused_decryptor()).unwrap();
        assert_eq!(dispatched, Dispatched::from(Event::Status));
    }

    #[test]
    fn test_ping_reads_signed_payload() {
        let bytes = frame(0x01, &(-42i64).to_be_bytes());
        let dispatched = run(ConnectionState::Status, &bytes, &unused_decryptor()).unwrap();
        assert_eq!(dispatched.event, Event::Ping { payload: -42 });
        assert!(dispatched.transition.is_none());
    }

    // ── Login ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_login_start_reads_username() {
        let bytes = frame(0x00, &encode_string("Notch"));
        let dispatched = run(ConnectionState::Login, &bytes, &unused_decryptor()).unwrap();
        assert_eq!(
            dispatched.event,
            Event::LoginStart {
                username: "Notch".to_string()
            }
        );
    }

    #[test]
    fn test_encryption_response_decrypts_both_blocks_in_order() {
        let mut decryptor = MockSecretDecryptor::new();
        let mut seq = mockall::Sequence::new();
        decryptor
            .expect_decrypt()
            .withf(|ciphertext| ciphertext.to_vec() == [0xA1, 0xA2, 0xA3])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"secret".to_vec()));
        decryptor
            .expect_decrypt()
            .withf(|ciphertext| ciphertext.to_vec() == [0xB1])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"token".to_vec()));

        let mut payload = encode_byte_array(&[0xA1, 0xA2, 0xA3]);
        payload.extend_from_slice(&encode_byte_array(&[0xB1]));
        let bytes = frame(0x01, &payload);

        let dispatched = run(ConnectionState::Login, &bytes, &decryptor).unwrap();
        assert_eq!(
            dispatched.event,
            Event::ConfirmEncryption {
                secret: b"secret".to_vec(),
                verify_token: b"token".to_vec(),
            }
        );
    }

    #[test]
    fn test_encryption_response_surfaces_decryption_failure() {
        let mut decryptor = MockSecretDecryptor::new();
        decryptor
            .expect_decrypt()
            .returning(|_| Err(DecryptError::new("bad padding")));

        let mut payload = encode_byte_array(&[0x01]);
        payload.extend_from_slice(&encode_byte_array(&[0x02]));
        let bytes = frame(0x01, &payload);

        let result = run(ConnectionState::Login, &bytes, &decryptor);
        assert_eq!(
            result,
            Err(DecodeError::Decryption("bad padding".to_string()))
        );
    }

    // ── Unhandled ─────────────────────────────────────────────────────────────

    #[test]
    fn test_unknown_id_in_status_is_unhandled_with_payload() {
        let bytes = frame(0x09, &[0xDE, 0xAD]);
        let result = run(ConnectionState::Status, &bytes, &unused_decryptor());
        assert_eq!(
            result,
            Err(DecodeError::UnhandledPacket {
                state: ConnectionState::Status,
                packet_id: 0x09,
                payload: vec![0xDE, 0xAD],
            })
        );
    }

    #[test]
    fn test_ping_id_in_handshake_state_is_unhandled() {
        let bytes = frame(0x01, &7i64.to_be_bytes());
        let result = run(ConnectionState::Handshake, &bytes, &unused_decryptor());
        assert!(matches!(
            result,
            Err(DecodeError::UnhandledPacket {
                state: ConnectionState::Handshake,
                packet_id: 0x01,
                ..
            })
        ));
    }

    #[test]
    fn test_routine_table_covers_exactly_five_pairs() {
        let states = [
            ConnectionState::Handshake,
            ConnectionState::Status,
            ConnectionState::Login,
        ];
        let registered = states
            .iter()
            .flat_map(|&state| (0..=0x7F).map(move |id| (state, id)))
            .filter(|&(state, id)| routine_for(state, id).is_some())
            .count();
        assert_eq!(registered, 5);
    }
}
