//! In-process key store. Keys vanish with the process.

use otpseal_core::{OtpError, OtpResult};
use otpseal_crypto::{generate_key_material, KeyHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::KeyStore;

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, KeyHandle>>,
    creations: AtomicUsize,
    locked: bool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every request, like a keychain on a locked device.
    pub fn locked() -> Self {
        Self {
            locked: true,
            ..Self::default()
        }
    }

    /// Number of keys generated so far.
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn contains(&self, alias: &str) -> OtpResult<bool> {
        Ok(self.lock_keys()?.contains_key(alias))
    }

    fn lock_keys(&self) -> OtpResult<MutexGuard<'_, HashMap<String, KeyHandle>>> {
        self.keys
            .lock()
            .map_err(|_| OtpError::KeyStoreUnavailable("memory key store poisoned".into()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_or_create(&self, alias: &str) -> OtpResult<KeyHandle> {
        if self.locked {
            return Err(OtpError::KeyStoreUnavailable("memory key store is locked".into()));
        }

        let mut keys = self.lock_keys()?;

        if let Some(handle) = keys.get(alias) {
            return Ok(handle.clone());
        }

        let key = generate_key_material()?;
        let handle = KeyHandle::from_key_bytes(alias, &key[..])?;
        keys.insert(alias.to_string(), handle.clone());
        self.creations.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(alias, "created in-memory key");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = MemoryKeyStore::new();
        let a = store.get_or_create("OTP_ENCRYPTION_KEY").unwrap();
        let b = store.get_or_create("OTP_ENCRYPTION_KEY").unwrap();

        assert!(a.same_key(&b));
        assert_eq!(store.creations(), 1);
        assert!(store.contains("OTP_ENCRYPTION_KEY").unwrap());
        assert!(!store.contains("OTHER_KEY").unwrap());
    }

    #[test]
    fn test_poisoned_store_reports_unavailable() {
        let store = std::sync::Arc::new(MemoryKeyStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.keys.lock().unwrap();
            panic!("poison the key map");
        })
        .join();

        assert!(matches!(
            store.contains("OTP_ENCRYPTION_KEY"),
            Err(OtpError::KeyStoreUnavailable(_))
        ));
        assert!(matches!(
            store.get_or_create("OTP_ENCRYPTION_KEY"),
            Err(OtpError::KeyStoreUnavailable(_))
        ));
    }

    #[test]
    fn test_locked_store_is_unavailable() {
        let store = MemoryKeyStore::locked();
        let result = store.get_or_create("OTP_ENCRYPTION_KEY");

        assert!(matches!(result, Err(OtpError::KeyStoreUnavailable(_))));
        assert_eq!(store.creations(), 0);
    }
}
