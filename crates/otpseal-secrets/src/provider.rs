//! Lazy, race-free key materialisation in front of a [`KeyStore`].

use otpseal_core::config::validate_alias;
use otpseal_core::{OtpError, OtpResult};
use otpseal_crypto::KeyHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::KeyStore;

/// Hands out key handles, creating each alias at most once per process.
///
/// Lookups of an already materialised alias only take a shared read lock.
/// Creation is serialised behind a mutex and re-checks the cache, so two
/// racing callers end up with the same handle and the store sees a single
/// `get_or_create` call.
pub struct KeyProvider {
    store: Arc<dyn KeyStore>,
    cache: RwLock<HashMap<String, KeyHandle>>,
    create_lock: Mutex<()>,
}

impl KeyProvider {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            create_lock: Mutex::new(()),
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn get_or_create_key(&self, alias: &str) -> OtpResult<KeyHandle> {
        if let Some(handle) = self.cached(alias)? {
            return Ok(handle);
        }

        validate_alias(alias)?;
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| poisoned("key creation lock"))?;

        if let Some(handle) = self.cached(alias)? {
            return Ok(handle);
        }

        let handle = self.store.get_or_create(alias).map_err(|e| {
            tracing::warn!(store = self.store.name(), alias, "key store request failed: {e}");
            e
        })?;

        self.cache
            .write()
            .map_err(|_| poisoned("key cache"))?
            .insert(alias.to_string(), handle.clone());
        tracing::debug!(store = self.store.name(), alias, "key handle materialised");
        Ok(handle)
    }

    fn cached(&self, alias: &str) -> OtpResult<Option<KeyHandle>> {
        let cache = self.cache.read().map_err(|_| poisoned("key cache"))?;
        Ok(cache.get(alias).cloned())
    }
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

fn poisoned(what: &str) -> OtpError {
    OtpError::KeyStoreUnavailable(format!("{what} poisoned by a panicked thread"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKeyStore;
    use otpseal_crypto::{decrypt, encrypt, generate_key_material};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    /// Check-then-create with a gap in between: two unsynchronised callers
    /// would both create a key.
    #[derive(Default)]
    struct RacyStore {
        keys: Mutex<HashMap<String, KeyHandle>>,
        creations: AtomicUsize,
        calls: AtomicUsize,
    }

    impl KeyStore for RacyStore {
        fn name(&self) -> &'static str {
            "racy"
        }

        fn get_or_create(&self, alias: &str) -> OtpResult<KeyHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(h) = self.keys.lock().unwrap().get(alias) {
                return Ok(h.clone());
            }
            std::thread::sleep(Duration::from_millis(25));
            let key = generate_key_material()?;
            let handle = KeyHandle::from_key_bytes(alias, &key[..])?;
            self.creations.fetch_add(1, Ordering::SeqCst);
            self.keys
                .lock()
                .unwrap()
                .insert(alias.to_string(), handle.clone());
            Ok(handle)
        }
    }

    #[test]
    fn test_cached_handle_reused() {
        let store = Arc::new(MemoryKeyStore::new());
        let provider = KeyProvider::new(store.clone());

        let a = provider.get_or_create_key("OTP_ENCRYPTION_KEY").unwrap();
        let b = provider.get_or_create_key("OTP_ENCRYPTION_KEY").unwrap();

        assert!(a.same_key(&b));
        assert_eq!(store.creations(), 1);
    }

    #[test]
    fn test_racing_callers_create_one_key() {
        let store = Arc::new(RacyStore::default());
        let provider = Arc::new(KeyProvider::new(store.clone()));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let provider = provider.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    provider.get_or_create_key("OTP_ENCRYPTION_KEY").unwrap()
                })
            })
            .collect();
        let keys: Vec<KeyHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.creations.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(keys[0].same_key(&keys[1]));

        let envelope = encrypt(&keys[0], b"483920").unwrap();
        assert_eq!(decrypt(&keys[1], &envelope).unwrap(), b"483920");
    }

    #[test]
    fn test_unavailable_store_propagates_and_is_not_cached() {
        let provider = KeyProvider::new(Arc::new(MemoryKeyStore::locked()));

        for _ in 0..2 {
            let result = provider.get_or_create_key("OTP_ENCRYPTION_KEY");
            assert!(matches!(result, Err(OtpError::KeyStoreUnavailable(_))));
        }
    }

    #[test]
    fn test_invalid_alias_rejected_before_store() {
        let store = Arc::new(MemoryKeyStore::new());
        let provider = KeyProvider::new(store.clone());

        let result = provider.get_or_create_key("bad/alias");
        assert!(matches!(result, Err(OtpError::Config(_))));
        assert_eq!(store.creations(), 0);
    }
}
