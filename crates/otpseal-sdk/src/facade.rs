use otpseal_core::config::DEFAULT_KEY_ALIAS;
use otpseal_core::{OtpError, OtpResult, OtpSealConfig};
use otpseal_crypto::{
    cipher, envelope, OsRandom, OtpGenerator, RandomSource, DEFAULT_OTP_LENGTH,
};
use otpseal_secrets::{open_key_store, KeyProvider, KeyStore};
use std::sync::Arc;
use zeroize::Zeroize;

/// OTP generation plus AES-256-GCM sealing under a store-held key.
#[derive(Debug)]
pub struct OtpSeal {
    keys: KeyProvider,
    alias: String,
    generator: OtpGenerator,
    default_length: usize,
}

pub struct OtpSealBuilder {
    store: Arc<dyn KeyStore>,
    alias: String,
    source: Arc<dyn RandomSource>,
    default_length: usize,
}

impl OtpSealBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Randomness used for digit generation. Nonces always come from the OS.
    pub fn random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.source = source;
        self
    }

    pub fn default_length(mut self, length: usize) -> Self {
        self.default_length = length;
        self
    }

    pub fn build(self) -> OtpResult<OtpSeal> {
        if self.default_length == 0 {
            return Err(OtpError::InvalidLength(0));
        }
        otpseal_core::config::validate_alias(&self.alias)?;
        Ok(OtpSeal {
            keys: KeyProvider::new(self.store),
            alias: self.alias,
            generator: OtpGenerator::new(self.source),
            default_length: self.default_length,
        })
    }
}

impl OtpSeal {
    /// Facade over `store` with the well-known alias and OS randomness.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            keys: KeyProvider::new(store),
            alias: DEFAULT_KEY_ALIAS.to_string(),
            generator: OtpGenerator::default(),
            default_length: DEFAULT_OTP_LENGTH,
        }
    }

    pub fn builder(store: Arc<dyn KeyStore>) -> OtpSealBuilder {
        OtpSealBuilder {
            store,
            alias: DEFAULT_KEY_ALIAS.to_string(),
            source: Arc::new(OsRandom),
            default_length: DEFAULT_OTP_LENGTH,
        }
    }

    pub fn from_config(config: &OtpSealConfig) -> OtpResult<Self> {
        config.validate()?;
        Self::builder(open_key_store(&config.keystore))
            .alias(config.keystore.alias.clone())
            .default_length(config.otp.length)
            .build()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn default_length(&self) -> usize {
        self.default_length
    }

    pub fn generate_otp(&self, length: usize) -> OtpResult<String> {
        self.generator.generate(length)
    }

    pub fn generate_default_otp(&self) -> OtpResult<String> {
        self.generator.generate(self.default_length)
    }

    /// Encrypt an OTP into `"<b64 ciphertext>:<b64 nonce>"`.
    ///
    /// Fails rather than returning anything unencrypted.
    pub fn encrypt_otp(&self, otp: &str) -> OtpResult<String> {
        let key = self.keys.get_or_create_key(&self.alias)?;
        let sealed = cipher::encrypt(&key, otp.as_bytes())?;
        tracing::debug!(alias = %self.alias, "sealed OTP");
        Ok(envelope::serialize(&sealed.ciphertext, &sealed.nonce))
    }

    pub fn decrypt_otp(&self, text: &str) -> OtpResult<String> {
        let sealed = envelope::parse(text)?;
        let key = self.keys.get_or_create_key(&self.alias)?;
        let plaintext = cipher::decrypt(&key, &sealed)?;
        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            OtpError::Decode("decrypted OTP is not valid UTF-8".into())
        })
    }

    /// Generate a code and seal it in one step; returns `(otp, envelope)`.
    pub fn issue_otp(&self, length: usize) -> OtpResult<(String, String)> {
        let otp = self.generate_otp(length)?;
        let sealed = self.encrypt_otp(&otp)?;
        Ok((otp, sealed))
    }
}
