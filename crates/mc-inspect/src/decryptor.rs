//! Decryptor used when no server key is available.

use mc_core::{DecryptError, SecretDecryptor};

/// Rejects every ciphertext.
///
/// The inspector never sends an encryption request, so it has no key pair and
/// cannot recover a shared secret.  A client that sends an encryption response
/// anyway gets its connection closed with a decryption error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredDecryptor;

impl SecretDecryptor for UnconfiguredDecryptor {
    fn decrypt(&self, _ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        Err(DecryptError::new("no server key configured"))
    }
}
