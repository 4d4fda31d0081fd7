//! Integration tests for the mc-core decoder.
//!
//! These tests drive complete connections through the public API: raw bytes in,
//! events and connection state out.  Packets are built by hand with the small
//! encoders below, since the crate itself only decodes.

use std::sync::Arc;

use mc_core::{
    protocol::cursor::Cursor, BlockPosition, ConnectionState, DecodeError, DecoderConfig,
    DecryptError, Event, PacketDecoder, SecretDecryptor,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Stand-in for the server's key: "decrypts" by reversing the bytes.
struct ReversingDecryptor;

impl SecretDecryptor for ReversingDecryptor {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        if ciphertext.is_empty() {
            return Err(DecryptError::new("empty ciphertext"));
        }
        Ok(ciphertext.iter().rev().copied().collect())
    }
}

fn new_decoder() -> PacketDecoder {
    PacketDecoder::new(
        DecoderConfig::accepting([5, 47, 340]),
        Arc::new(ReversingDecryptor),
    )
}

fn varint(value: i32) -> Vec<u8> {
    let mut remaining = value as u32;
    let mut out = Vec::new();
    loop {
        let group = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining == 0 {
            out.push(group);
            return out;
        }
        out.push(group | 0x80);
    }
}

fn string(s: &str) -> Vec<u8> {
    let mut out = varint(s.len() as i32);
    out.extend_from_slice(s.as_bytes());
    out
}

fn frame(packet_id: i32, payload: &[u8]) -> Vec<u8> {
    let mut body = varint(packet_id);
    body.extend_from_slice(payload);
    let mut out = varint(body.len() as i32);
    out.extend_from_slice(&body);
    out
}

fn handshake(protocol: i32, hostname: &str, port: u16, next_state: i32) -> Vec<u8> {
    let mut payload = varint(protocol);
    payload.extend_from_slice(&string(hostname));
    payload.extend_from_slice(&port.to_be_bytes());
    payload.extend_from_slice(&varint(next_state));
    frame(0x00, &payload)
}

fn utf16_be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

// ── Primitives ────────────────────────────────────────────────────────────────

#[test]
fn test_varint_round_trip_through_public_cursor() {
    for value in [0, 1, 127, 128, 16383, 2_097_151, -1, i32::MIN, i32::MAX] {
        let bytes = varint(value);
        assert!(bytes.len() <= 5);
        assert_eq!(Cursor::new(&bytes).read_varint(), Ok(value));
    }
}

#[test]
fn test_overlong_varint_is_rejected() {
    let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
    assert_eq!(
        Cursor::new(&bytes).read_varint(),
        Err(DecodeError::VarIntTooLong)
    );
}

#[test]
fn test_string_round_trip_and_truncation() {
    let bytes = string("héllo");
    assert_eq!(Cursor::new(&bytes).read_string().as_deref(), Ok("héllo"));

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(
        Cursor::new(truncated).read_string(),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn test_position_round_trip() {
    let (x, y, z) = (-3_000_000i32, 100i32, 3_000_000i32);
    let packed: u64 =
        ((x as u64 & 0x3FF_FFFF) << 38) | ((y as u64 & 0xFFF) << 26) | (z as u64 & 0x3FF_FFFF);

    let position = Cursor::new(&packed.to_be_bytes()).read_position().unwrap();

    assert_eq!(position, BlockPosition { x, y, z });
}

// ── Handshake ─────────────────────────────────────────────────────────────────

#[test]
fn test_handshake_to_login() {
    let mut decoder = new_decoder();
    let bytes = handshake(47, "localhost", 25565, 2);

    let (rest, event) = decoder.decode(&bytes).expect("handshake must decode");

    assert_eq!(
        event,
        Event::Handshake {
            hostname: "localhost".to_string(),
            port: 25565,
        }
    );
    assert!(rest.is_empty());
    assert_eq!(decoder.state(), ConnectionState::Login);
    assert_eq!(decoder.protocol_version(), Some(47));
}

#[test]
fn test_handshake_with_unsupported_protocol_is_rejected() {
    let mut decoder = new_decoder();
    let bytes = handshake(758, "localhost", 25565, 2);

    assert_eq!(
        decoder.decode(&bytes),
        Err(DecodeError::UnsupportedProtocol(758))
    );
    assert_eq!(decoder.state(), ConnectionState::Handshake);
    assert_eq!(decoder.protocol_version(), None);
}

#[test]
fn test_frame_declaring_more_than_available_is_rejected() {
    let mut decoder = new_decoder();
    let mut bytes = handshake(47, "localhost", 25565, 2);
    bytes.truncate(bytes.len() - 3);

    assert!(matches!(
        decoder.decode(&bytes),
        Err(DecodeError::FrameTooShort { .. })
    ));
    assert_eq!(decoder.state(), ConnectionState::Handshake);
}

// ── Status ────────────────────────────────────────────────────────────────────

#[test]
fn test_server_list_ping_sequence() {
    let mut decoder = new_decoder();
    let mut bytes = handshake(340, "mc.example.org", 25565, 1);
    bytes.extend_from_slice(&frame(0x00, &[]));
    bytes.extend_from_slice(&frame(0x01, &1_700_000_000_000i64.to_be_bytes()));

    let events = decoder.decode_all(&bytes).unwrap();

    let kinds: Vec<&str> = events.iter().map(Event::kind).collect();
    assert_eq!(kinds, ["handshake", "status", "ping"]);
    assert_eq!(
        events[2],
        Event::Ping {
            payload: 1_700_000_000_000
        }
    );
    assert_eq!(decoder.state(), ConnectionState::Status);
}

#[test]
fn test_unknown_packet_in_status_is_unhandled() {
    let mut decoder = new_decoder();
    decoder.decode(&handshake(47, "localhost", 25565, 1)).unwrap();

    let bytes = frame(0x09, &[0x01, 0x02]);
    let result = decoder.decode(&bytes);

    assert_eq!(
        result,
        Err(DecodeError::UnhandledPacket {
            state: ConnectionState::Status,
            packet_id: 9,
            payload: vec![0x01, 0x02],
        })
    );
    assert_eq!(decoder.state(), ConnectionState::Status);
}

#[test]
fn test_status_packet_sent_before_handshake_is_unhandled() {
    let mut decoder = new_decoder();
    let bytes = frame(0x01, &0i64.to_be_bytes());
    let result = decoder.decode(&bytes);
    assert!(matches!(
        result,
        Err(DecodeError::UnhandledPacket {
            state: ConnectionState::Handshake,
            packet_id: 1,
            ..
        })
    ));
}

// ── Login ─────────────────────────────────────────────────────────────────────

#[test]
fn test_login_with_encryption_response() {
    let mut decoder = new_decoder();
    let mut encryption = varint(3);
    encryption.extend_from_slice(&[1, 2, 3]);
    encryption.extend_from_slice(&varint(2));
    encryption.extend_from_slice(&[9, 8]);

    let mut bytes = handshake(5, "localhost", 25565, 2);
    bytes.extend_from_slice(&frame(0x00, &string("Notch")));
    bytes.extend_from_slice(&frame(0x01, &encryption));

    let events = decoder.decode_all(&bytes).unwrap();

    assert_eq!(
        events[1],
        Event::LoginStart {
            username: "Notch".to_string()
        }
    );
    assert_eq!(
        events[2],
        Event::ConfirmEncryption {
            secret: vec![3, 2, 1],
            verify_token: vec![8, 9],
        }
    );
    assert_eq!(decoder.protocol_version(), Some(5));
}

#[test]
fn test_decryptor_failure_aborts_decode() {
    let mut decoder = new_decoder();
    decoder.decode(&handshake(47, "localhost", 25565, 2)).unwrap();

    let mut encryption = varint(0);
    encryption.extend_from_slice(&varint(0));
    let bytes = frame(0x01, &encryption);
    let result = decoder.decode(&bytes);

    assert_eq!(
        result,
        Err(DecodeError::Decryption("empty ciphertext".to_string()))
    );
}

// ── Legacy probe ──────────────────────────────────────────────────────────────

#[test]
fn test_legacy_probe_is_decoded_without_framing() {
    let channel = "MC|PingHost";
    let hostname = "play.example.com";
    let mut bytes = vec![0xFE, 0x01, 0xFA];
    bytes.extend_from_slice(&(channel.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&utf16_be(channel));
    bytes.extend_from_slice(&(7 + 2 * hostname.len() as u16).to_be_bytes());
    bytes.push(74);
    bytes.extend_from_slice(&(hostname.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&utf16_be(hostname));
    bytes.extend_from_slice(&25565i32.to_be_bytes());

    let mut decoder = new_decoder();
    let (rest, event) = decoder.decode(&bytes).unwrap();

    assert_eq!(
        event,
        Event::LegacyProbe {
            protocol: 74,
            hostname: hostname.to_string(),
            port: 25565,
        }
    );
    assert_eq!(event.kind(), "connect_16");
    assert!(rest.is_empty());
    assert_eq!(decoder.state(), ConnectionState::Handshake);
}

#[test]
fn test_truncated_legacy_probe_fails() {
    let mut decoder = new_decoder();
    assert!(matches!(
        decoder.decode(&[0xFE, 0x01, 0xFA, 0x00]),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn test_empty_input_is_rejected() {
    assert_eq!(new_decoder().decode(&[]), Err(DecodeError::EmptyPacket));
}
