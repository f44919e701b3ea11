//! Platform keychain key store.
//!
//! Uses the `keyring` crate for cross-platform access:
//! - macOS: Keychain Services
//! - Linux: GNOME Keyring / Secret Service (D-Bus)
//! - Windows: Credential Manager (DPAPI)
//!
//! The key is kept base64-encoded as the entry's password under
//! `(service, alias)`. If no platform backend is compiled in, `keyring` hands
//! out its in-memory mock; such entries are refused with `KeyStoreUnavailable`
//! because every new entry would produce a fresh key.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use otpseal_core::{OtpError, OtpResult};
use otpseal_crypto::{generate_key_material, KeyHandle};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::KeyStore;

#[derive(Debug, Clone)]
pub struct KeychainKeyStore {
    service: String,
}

impl KeychainKeyStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, alias: &str) -> OtpResult<keyring::Entry> {
        let entry = keyring::Entry::new(&self.service, alias).map_err(|e| {
            OtpError::KeyStoreUnavailable(format!("keychain entry '{}/{alias}': {e}", self.service))
        })?;
        ensure_persistent(&entry)?;
        Ok(entry)
    }

    fn load(alias: &str, encoded: &SecretString) -> OtpResult<KeyHandle> {
        let key = Zeroizing::new(B64.decode(encoded.expose_secret().trim()).map_err(|e| {
            OtpError::CipherInit(format!("keychain entry '{alias}' is not valid base64: {e}"))
        })?);
        KeyHandle::from_key_bytes(alias, &key)
    }

    fn create(&self, alias: &str, entry: &keyring::Entry) -> OtpResult<KeyHandle> {
        let key = generate_key_material()?;
        let encoded = SecretString::from(B64.encode(&key[..]));
        entry.set_password(encoded.expose_secret()).map_err(|e| {
            OtpError::KeyStoreUnavailable(format!("keychain store for '{alias}': {e}"))
        })?;
        tracing::info!(service = %self.service, alias, "created OTP encryption key in platform keychain");
        KeyHandle::from_key_bytes(alias, &key[..])
    }
}

impl KeyStore for KeychainKeyStore {
    fn name(&self) -> &'static str {
        "keychain"
    }

    fn get_or_create(&self, alias: &str) -> OtpResult<KeyHandle> {
        let entry = self.entry(alias)?;
        match entry.get_password() {
            Ok(password) => {
                let encoded = SecretString::from(password);
                tracing::debug!(service = %self.service, alias, "loaded key from platform keychain");
                Self::load(alias, &encoded)
            }
            Err(keyring::Error::NoEntry) => self.create(alias, &entry),
            Err(e) => Err(OtpError::KeyStoreUnavailable(format!(
                "keychain get for '{alias}': {e}"
            ))),
        }
    }
}

/// Reject keyring's mock credential: it lives only as long as the entry.
fn ensure_persistent(entry: &keyring::Entry) -> OtpResult<()> {
    if entry
        .get_credential()
        .downcast_ref::<keyring::mock::MockCredential>()
        .is_some()
    {
        return Err(OtpError::KeyStoreUnavailable(
            "no platform keychain backend on this target; use the file backend".into(),
        ));
    }
    Ok(())
}
