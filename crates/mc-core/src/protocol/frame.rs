//! Length-prefixed packet framing.
//!
//! Wire format:
//! ```text
//! [length: varint][packet_id: varint][payload: length - size_of(packet_id)]
//! ```
//! `length` counts every byte after the prefix itself, including the packet
//! id.  The next packet always starts exactly `length` bytes after the prefix,
//! regardless of how much of the payload its handler actually read.

use crate::protocol::cursor::Cursor;
use crate::protocol::error::DecodeError;

/// One length-delimited packet, borrowed from the input buffer.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Byte count declared by the length prefix.
    pub declared_length: usize,
    /// Packet identifier, read from inside the declared region.
    pub packet_id: i32,
    /// Cursor over the bytes following the packet id, bounded by the frame.
    pub payload: Cursor<'a>,
    /// Absolute offset of the first byte after this frame.
    pub end: usize,
}

/// Reads a frame header from `cursor`.
///
/// The outer cursor is left just after the length prefix; the caller seeks
/// to [`Frame::end`] once the payload has been handled.
///
/// # Errors
///
/// - [`DecodeError::FrameTooShort`] if fewer than the declared bytes follow the
///   prefix.
/// - [`DecodeError::NegativeLength`] if the prefix is negative.
/// - [`DecodeError::Truncated`] if the packet id does not fit in the frame.
/// - [`DecodeError::VarIntTooLong`] for a malformed prefix or packet id.
pub fn read_frame<'a>(cursor: &mut Cursor<'a>) -> Result<Frame<'a>, DecodeError> {
    let declared = cursor.read_varint()?;
    let declared_length =
        usize::try_from(declared).map_err(|_| DecodeError::NegativeLength(declared))?;

    let start = cursor.position();
    let body = cursor.rest();
    if declared_length > body.len() {
        return Err(DecodeError::FrameTooShort {
            declared: declared_length,
            available: body.len(),
        });
    }

    let mut payload = Cursor::new(&body[..declared_length]);
    let packet_id = payload.read_varint()?;

    Ok(Frame {
        declared_length,
        packet_id,
        payload,
        end: start + declared_length,
    })
}

/// Total size (prefix included) of the first frame in `buf`, once all of it
/// has been received.
///
/// Returns `Ok(None)` while the length prefix or the body is still
/// incomplete.  Stream readers use this to decide when a buffer is ready for
/// [`crate::PacketDecoder::decode`].
///
/// # Errors
///
/// Returns [`DecodeError::VarIntTooLong`] or [`DecodeError::NegativeLength`]
/// when the prefix can never become valid, however many bytes arrive.
pub fn complete_frame_len(buf: &[u8]) -> Result<Option<usize>, DecodeError> {
    let mut cursor = Cursor::new(buf);
    let declared = match cursor.read_varint() {
        Ok(declared) => declared,
        Err(DecodeError::Truncated { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let declared_length =
        usize::try_from(declared).map_err(|_| DecodeError::NegativeLength(declared))?;
    let total = cursor.position() + declared_length;
    Ok((buf.len() >= total).then_some(total))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
