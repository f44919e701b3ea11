use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OtpError, OtpResult};

/// Well-known alias the OTP encryption key lives under.
pub const DEFAULT_KEY_ALIAS: &str = "OTP_ENCRYPTION_KEY";

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSealConfig {
    pub keystore: KeyStoreConfig,
    pub otp: OtpConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreBackend {
    /// Platform keychain (macOS Keychain, Secret Service, Windows Credential Manager)
    #[default]
    Keychain,
    /// 0600 key files under `key_dir`
    File,
    /// Process-local, lost on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    pub backend: KeyStoreBackend,
    /// Keychain service name (default: otpseal)
    pub service: String,
    /// Alias of the encryption key (default: OTP_ENCRYPTION_KEY)
    pub alias: String,
    /// Directory for the file backend
    pub key_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Number of digits produced when no length is given (default: 6)
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            backend: KeyStoreBackend::Keychain,
            service: "otpseal".into(),
            alias: DEFAULT_KEY_ALIAS.into(),
            key_dir: PathBuf::from("~/.local/share/otpseal/keys"),
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl OtpSealConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> OtpResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OtpError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `$XDG_CONFIG_HOME/otpseal/config.toml`,
    /// falling back to `~/.config/otpseal/config.toml`.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("otpseal/config.toml"),
            _ => expand_home(Path::new("~/.config/otpseal/config.toml")),
        }
    }

    pub fn validate(&self) -> OtpResult<()> {
        if self.otp.length == 0 {
            return Err(OtpError::Config("otp.length must be at least 1".into()));
        }
        validate_alias(&self.keystore.alias)?;
        if self.keystore.service.is_empty() {
            return Err(OtpError::Config("keystore.service must not be empty".into()));
        }
        Ok(())
    }
}

/// Aliases end up in keychain entry names and file names, so they are
/// restricted to `[A-Za-z0-9_.-]` and must not start with a dot.
pub fn validate_alias(alias: &str) -> OtpResult<()> {
    if alias.is_empty() {
        return Err(OtpError::Config("key alias must not be empty".into()));
    }
    if alias.starts_with('.') {
        return Err(OtpError::Config(format!("key alias must not start with '.': {alias:?}")));
    }
    if let Some(bad) = alias
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(OtpError::Config(format!(
            "key alias {alias:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

/// Expand a leading `~` to `$HOME`. Paths without one are returned as-is.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
