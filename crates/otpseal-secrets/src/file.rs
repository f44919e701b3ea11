//! File-backed key store for hosts without a platform keychain.
//!
//! Layout: `<dir>/<alias>.key` containing the base64 key, mode 0600 inside a
//! 0700 directory. New keys are written to a private temp file and then
//! hard-linked into place, so readers never see a partial file and a losing
//! creator adopts the winner's key.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use otpseal_core::config::validate_alias;
use otpseal_core::{OtpError, OtpResult};
use otpseal_crypto::{generate_key_material, KeyHandle};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::KeyStore;

#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self, alias: &str) -> OtpResult<PathBuf> {
        validate_alias(alias)?;
        Ok(self.dir.join(format!("{alias}.key")))
    }

    fn load(path: &Path, alias: &str) -> OtpResult<Option<KeyHandle>> {
        let encoded = match std::fs::read_to_string(path) {
            Ok(s) => Zeroizing::new(s),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(path, e)),
        };
        let key = Zeroizing::new(B64.decode(encoded.trim()).map_err(|e| {
            OtpError::CipherInit(format!("key file {} is not valid base64: {e}", path.display()))
        })?);
        KeyHandle::from_key_bytes(alias, &key).map(Some)
    }

    fn create(&self, path: &Path, alias: &str) -> OtpResult<KeyHandle> {
        create_private_dir(&self.dir).map_err(|e| unavailable(&self.dir, e))?;

        let key = generate_key_material()?;
        let encoded = Zeroizing::new(B64.encode(&key[..]));

        let tmp = self
            .dir
            .join(format!(".{alias}.{}.tmp", uuid::Uuid::new_v4()));
        write_private_file(&tmp, encoded.as_bytes()).map_err(|e| unavailable(&tmp, e))?;

        let linked = std::fs::hard_link(&tmp, path);
        if let Err(e) = std::fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp.display(), "failed to remove temp key file: {e}");
        }

        match linked {
            Ok(()) => {
                tracing::info!(path = %path.display(), alias, "created OTP encryption key file");
                KeyHandle::from_key_bytes(alias, &key[..])
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "key file created concurrently, adopting it");
                Self::load(path, alias)?.ok_or_else(|| {
                    OtpError::KeyStoreUnavailable(format!(
                        "key file {} vanished during creation",
                        path.display()
                    ))
                })
            }
            Err(e) => Err(unavailable(path, e)),
        }
    }
}

impl KeyStore for FileKeyStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_or_create(&self, alias: &str) -> OtpResult<KeyHandle> {
        let path = self.key_path(alias)?;
        match Self::load(&path, alias)? {
            Some(handle) => Ok(handle),
            None => self.create(&path, alias),
        }
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> OtpError {
    OtpError::KeyStoreUnavailable(format!("{}: {e}", path.display()))
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut f = options.open(path)?;
    f.write_all(contents)?;
    f.sync_all()
}
