//! otpseal-secrets: where the OTP encryption key lives
//!
//! Backends (selected by `[keystore] backend`):
//!   - `keychain`: platform keychain via `keyring` (default)
//!   - `file`:     base64 key files, 0600, created atomically
//!   - `memory`:   process-local, for tests and ephemeral use
//!
//! [`KeyProvider`] sits in front of any backend and guarantees that a given
//! alias is materialised at most once per process.

pub mod file;
pub mod keychain;
pub mod memory;
pub mod provider;

pub use file::FileKeyStore;
pub use keychain::KeychainKeyStore;
pub use memory::MemoryKeyStore;
pub use provider::KeyProvider;

use otpseal_core::config::{expand_home, KeyStoreBackend, KeyStoreConfig};
use otpseal_core::OtpResult;
use otpseal_crypto::KeyHandle;
use std::sync::Arc;

/// A secure store holding named AES-256 keys.
///
/// Implementations return an opaque [`KeyHandle`], creating the key on first
/// use. Raw key material never crosses this boundary.
pub trait KeyStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Look up `alias`, generating and persisting a new key if absent.
    fn get_or_create(&self, alias: &str) -> OtpResult<KeyHandle>;
}

/// Build the backend selected in configuration.
pub fn open_key_store(config: &KeyStoreConfig) -> Arc<dyn KeyStore> {
    match config.backend {
        KeyStoreBackend::Keychain => Arc::new(KeychainKeyStore::new(&config.service)),
        KeyStoreBackend::File => Arc::new(FileKeyStore::new(expand_home(&config.key_dir))),
        KeyStoreBackend::Memory => Arc::new(MemoryKeyStore::new()),
    }
}
