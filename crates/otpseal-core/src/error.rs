use thiserror::Error;

pub type OtpResult<T> = Result<T, OtpError>;

#[derive(Debug, Error)]
pub enum OtpError {
    /// The secure key store could not be opened or queried (locked device,
    /// missing keychain daemon, permission failure).
    #[error("key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    /// A key handle could not be turned into a working cipher.
    #[error("cipher init error: {0}")]
    CipherInit(String),

    #[error("crypto operation failed: {0}")]
    CryptoOperation(String),

    /// Tag verification failed: tampered data, wrong key or wrong nonce.
    #[error("authentication failed: ciphertext or nonce was altered, or the key does not match")]
    AuthenticationFailure,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid OTP length: {0} (must be at least 1)")]
    InvalidLength(usize),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OtpError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, OtpError::AuthenticationFailure)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, OtpError::MalformedEnvelope(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_is_distinct_from_format_errors() {
        let auth = OtpError::AuthenticationFailure;
        let malformed = OtpError::MalformedEnvelope("missing ':' separator".into());

        assert!(auth.is_authentication_failure());
        assert!(!auth.is_malformed());
        assert!(malformed.is_malformed());
        assert!(!malformed.is_authentication_failure());
    }

    #[test]
    fn messages_carry_context() {
        let err = OtpError::KeyStoreUnavailable("keychain locked".into());
        assert_eq!(err.to_string(), "key store unavailable: keychain locked");
        assert!(OtpError::InvalidLength(0).to_string().contains("at least 1"));
    }
}
