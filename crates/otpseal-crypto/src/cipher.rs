//! AES-256-GCM encryption/decryption against a key handle
//!
//! Ciphertext layout (per GCM convention):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//! The 12-byte nonce travels next to it in the [`Envelope`], never inside.

use aes_gcm::{aead::Aead, Nonce};
use otpseal_core::{OtpError, OtpResult};
use rand::{rngs::OsRng, RngCore};

use crate::envelope::Envelope;
use crate::handle::KeyHandle;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under `handle` with a freshly drawn random nonce.
///
/// Returns the ciphertext (with the 16-byte tag appended) and the nonce used.
pub fn encrypt(handle: &KeyHandle, plaintext: &[u8]) -> OtpResult<Envelope> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| OtpError::CryptoOperation(format!("nonce generation failed: {e}")))?;

    let ciphertext = handle
        .cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| OtpError::CryptoOperation(format!("AES-256-GCM encryption failed: {e}")))?;

    tracing::trace!(
        alias = handle.alias(),
        ciphertext_len = ciphertext.len(),
        "encrypted payload"
    );
    Ok(Envelope::new(ciphertext, nonce))
}

/// Verify and decrypt an envelope produced by [`encrypt`].
///
/// Any tag mismatch (altered ciphertext, altered nonce, other key) is reported
/// as [`OtpError::AuthenticationFailure`]; no plaintext is released.
pub fn decrypt(handle: &KeyHandle, envelope: &Envelope) -> OtpResult<Vec<u8>> {
    if envelope.ciphertext.len() < TAG_SIZE {
        return Err(OtpError::MalformedEnvelope(format!(
            "ciphertext too short: {} bytes (minimum {TAG_SIZE})",
            envelope.ciphertext.len()
        )));
    }

    handle
        .cipher()
        .decrypt(
            Nonce::from_slice(&envelope.nonce),
            envelope.ciphertext.as_slice(),
        )
        .map_err(|_| {
            tracing::debug!(alias = handle.alias(), "GCM tag verification failed");
            OtpError::AuthenticationFailure
        })
}
