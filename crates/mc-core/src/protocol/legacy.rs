//! Legacy server-list probe.
//!
//! Clients from before length-prefixed framing existed open a connection by
//! sending `0xFE` and a fixed structure of big-endian fields with UTF-16 text.
//! Only the first byte of the buffer is inspected to choose this path.
//!
//! ```text
//! [ident:u8 = 0xFE][marker:u8 = 0x01][sub_ident:u8 = 0xFA]
//! [channel_len:u16][channel: channel_len UTF-16BE units]   "MC|PingHost"
//! [remaining:u16]                                          not validated
//! [protocol:u8]
//! [host_len:u16][hostname: host_len UTF-16BE units]
//! [port:i32]
//! ```

use tracing::trace;

use crate::protocol::cursor::Cursor;
use crate::protocol::error::DecodeError;
use crate::protocol::events::Event;

/// First byte of every legacy probe.
pub const LEGACY_PROBE_SENTINEL: u8 = 0xFE;

/// Returns `true` if `buf` starts with the legacy probe sentinel.
pub fn is_legacy_probe(buf: &[u8]) -> bool {
    buf.first() == Some(&LEGACY_PROBE_SENTINEL)
}

/// Decodes a legacy probe starting at the cursor's position.
///
/// All fields are consumed strictly in order.  The format has no overall
/// length, so nothing is cross-checked: a short buffer simply fails the first
/// read that runs off its end.
///
/// # Errors
///
/// Returns [`DecodeError::Truncated`] for a short buffer and
/// [`DecodeError::InvalidEncoding`] for malformed UTF-16 text.
pub fn decode_legacy_probe(cursor: &mut Cursor<'_>) -> Result<Event, DecodeError> {
    let _ident = cursor.read_u8()?;
    let _marker = cursor.read_u8()?;
    let _sub_ident = cursor.read_u8()?;

    let channel_len = cursor.read_u16()?;
    let channel = cursor.read_utf16_be(usize::from(channel_len))?;
    let _remaining = cursor.read_u16()?;

    let protocol = cursor.read_u8()?;
    let host_len = cursor.read_u16()?;
    let hostname = cursor.read_utf16_be(usize::from(host_len))?;
    let port = cursor.read_i32()?;

    trace!(%channel, protocol, %hostname, port, "decoded legacy probe");
    Ok(Event::LegacyProbe {
        protocol,
        hostname,
        port,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
