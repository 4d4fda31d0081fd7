//! Forward-only reader over an in-memory byte buffer.
//!
//! Primitive encodings used by the protocol:
//! ```text
//! fixed-width int   big-endian, 1/2/4/8 bytes
//! varint            7 bits per byte, least-significant group first,
//!                   bit 7 set = "more bytes follow", at most 5 bytes
//! string            varint byte length + UTF-8 bytes
//! position          one u64: x (26 bits) | y (12 bits) | z (26 bits)
//! ```
//!
//! Every read either returns the complete value and advances the cursor, or
//! fails with [`DecodeError::Truncated`] without producing partial data.

use crate::protocol::error::DecodeError;
use crate::protocol::events::BlockPosition;

/// Maximum number of bytes a 32-bit varint may occupy.
pub const VARINT_MAX_BYTES: usize = 5;

mod sealed {
    pub trait Sealed {}
}

/// Integer types that can be read as big-endian fixed-width values.
///
/// Implemented for `u8`, `i8`, `u16`, `i16`, `u32`, `i32`, `u64`, and `i64`.
pub trait FixedWidth: sealed::Sealed + Sized {
    /// Encoded size in bytes.
    const WIDTH: usize;

    /// Converts exactly [`Self::WIDTH`] big-endian bytes into the value.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_be_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_be_bytes(raw)
                }
            }
        )*
    };
}

impl_fixed_width!(u8, i8, u16, i16, u32, i32, u64, i64);

/// A read position inside a borrowed byte slice.
///
/// A cursor is created for one decode call and dropped when the call returns;
/// it never outlives the buffer it borrows.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` when every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// All unread bytes, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Moves the cursor to an absolute `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if `offset` lies past the end of the
    /// buffer.
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.buf.len() {
            return Err(DecodeError::Truncated {
                needed: offset,
                available: self.buf.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Reads exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.remaining();
        if available < n {
            return Err(DecodeError::Truncated {
                needed: n,
                available,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Splits off the next `n` bytes as a cursor of their own.
    ///
    /// Reads through the returned cursor can never run past those `n` bytes,
    /// which is how a packet handler is confined to its frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<Cursor<'a>, DecodeError> {
        self.read_bytes(n).map(Cursor::new)
    }

    /// Reads a big-endian fixed-width integer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mc_core::protocol::cursor::Cursor;
    ///
    /// let mut cursor = Cursor::new(&[0x63, 0xDD, 0xFF]);
    /// assert_eq!(cursor.read_fixed::<u16>().unwrap(), 25565);
    /// assert_eq!(cursor.read_fixed::<i8>().unwrap(), -1);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than `T::WIDTH` bytes remain.
    pub fn read_fixed<T: FixedWidth>(&mut self) -> Result<T, DecodeError> {
        self.read_bytes(T::WIDTH).map(T::from_be_slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.read_fixed()
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.read_fixed()
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.read_fixed()
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.read_fixed()
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.read_fixed()
    }

    /// Reads a variable-length 32-bit integer.
    ///
    /// # How varints work (for beginners)
    ///
    /// Small numbers are common on the wire, so instead of always spending 4
    /// bytes the value is cut into 7-bit groups, least-significant group first.
    /// Each group is stored in the low 7 bits of a byte; the top bit says
    /// whether another byte follows.  `300` (`0b10_0101100`) becomes
    /// `[0xAC, 0x02]`.
    ///
    /// Five groups hold 35 bits, enough for any `i32`, so a fifth byte that
    /// still has its continuation bit set is malformed.  The loop bound is what
    /// keeps a hostile stream from shifting bits out of the accumulator.
    /// Negative numbers use all 32 bits and therefore always take five bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::VarIntTooLong`] after five continuation bytes, or
    /// [`DecodeError::Truncated`] if the buffer ends mid-varint.
    pub fn read_varint(&mut self) -> Result<i32, DecodeError> {
        let mut value: u32 = 0;
        for group in 0..VARINT_MAX_BYTES {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << (7 * group);
            if byte & 0x80 == 0 {
                // Reinterpreting the bits as i32 is the two's-complement step.
                return Ok(value as i32);
            }
        }
        Err(DecodeError::VarIntTooLong)
    }

    /// Reads a varint that is used as a byte count.
    fn read_length(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| DecodeError::NegativeLength(len))
    }

    /// Reads a varint length prefix followed by that many raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NegativeLength`] for a negative prefix and
    /// [`DecodeError::Truncated`] if the block extends past the buffer.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_length()?;
        self.read_bytes(len)
    }

    /// Reads a varint byte length followed by that many UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidEncoding`] if the bytes are not UTF-8, and
    /// the same errors as [`Cursor::read_byte_array`] for a bad length.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_byte_array()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| DecodeError::InvalidEncoding(format!("invalid UTF-8: {e}")))
    }

    /// Reads `units` big-endian UTF-16 code units (two bytes each).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidEncoding`] on an unpaired surrogate and
    /// [`DecodeError::Truncated`] if fewer than `units * 2` bytes remain.
    pub fn read_utf16_be(&mut self, units: usize) -> Result<String, DecodeError> {
        let byte_len = units.checked_mul(2).ok_or(DecodeError::Truncated {
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        let bytes = self.read_bytes(byte_len)?;
        let code_units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(code_units)
            .collect::<Result<String, _>>()
            .map_err(|e| DecodeError::InvalidEncoding(format!("invalid UTF-16: {e}")))
    }

    /// Reads a block position packed into one unsigned 64-bit value.
    ///
    /// ```text
    /// bit 63           38 37      26 25            0
    ///     [  x: 26 bits  ][ y: 12  ][  z: 26 bits  ]
    /// ```
    /// Each field is a two's-complement number of its own width.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_position(&mut self) -> Result<BlockPosition, DecodeError> {
        let packed = self.read_u64()?;
        Ok(BlockPosition {
            x: sign_extend(packed >> 38, 26),
            y: sign_extend((packed >> 26) & 0xFFF, 12),
            z: sign_extend(packed & 0x3FF_FFFF, 26),
        })
    }
}

/// Interprets the low `bits` bits of `value` as a two's-complement number.
fn sign_extend(value: u64, bits: u32) -> i32 {
    let value = value as i64;
    if value & (1 << (bits - 1)) != 0 {
        (value - (1 << bits)) as i32
    } else {
        value as i32
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
