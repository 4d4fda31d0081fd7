//! Protocol module containing the byte cursor, framer, dispatcher, and the
//! per-connection decoder built on top of them.

pub mod cursor;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod frame;
pub mod legacy;

pub use decoder::{DecoderConfig, DecryptError, PacketDecoder, SecretDecryptor};
pub use error::DecodeError;
pub use events::{BlockPosition, Event};
