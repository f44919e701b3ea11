//! Opaque key handles

use aes_gcm::{Aes256Gcm, KeyInit};
use otpseal_core::{OtpError, OtpResult};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::KEY_SIZE;

/// Reference to an AES-256-GCM key held by a key store.
///
/// The handle owns an initialised cipher, never the key bytes themselves, and
/// offers no way to read them back. Clones share the same cipher.
#[derive(Clone)]
pub struct KeyHandle {
    alias: Arc<str>,
    cipher: Arc<Aes256Gcm>,
}

impl KeyHandle {
    /// Build a handle from key material loaded or generated by a key store.
    ///
    /// The caller keeps ownership of `key` and is responsible for wiping it.
    pub fn from_key_bytes(alias: &str, key: &[u8]) -> OtpResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            OtpError::CipherInit(format!(
                "key '{alias}' has {} bytes (expected {KEY_SIZE})",
                key.len()
            ))
        })?;
        Ok(Self {
            alias: Arc::from(alias),
            cipher: Arc::new(cipher),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// True when both handles refer to the same materialised key.
    pub fn same_key(&self, other: &KeyHandle) -> bool {
        Arc::ptr_eq(&self.cipher, &other.cipher)
    }

    pub(crate) fn cipher(&self) -> &Aes256Gcm {
        &self.cipher
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHandle")
            .field("alias", &self.alias)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generate fresh 256-bit key material from the OS CSPRNG. Wiped on drop.
pub fn generate_key_material() -> OtpResult<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng
        .try_fill_bytes(&mut key[..])
        .map_err(|e| OtpError::CryptoOperation(format!("OS random source failed: {e}")))?;
    Ok(key)
}
