//! Envelope text codec
//!
//! Format:
//! ```text
//! base64(ciphertext||tag) ":" base64(nonce)
//! ```
//! Both halves use the standard alphabet with `=` padding.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use otpseal_core::{OtpError, OtpResult};

use crate::NONCE_SIZE;

const SEPARATOR: char = ':';

/// Ciphertext (tag included) plus the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

impl Envelope {
    pub fn new(ciphertext: Vec<u8>, nonce: [u8; NONCE_SIZE]) -> Self {
        Self { ciphertext, nonce }
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&serialize(&self.ciphertext, &self.nonce))
    }
}

impl std::str::FromStr for Envelope {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

pub fn serialize(ciphertext: &[u8], nonce: &[u8; NONCE_SIZE]) -> String {
    let mut out = B64.encode(ciphertext);
    out.push(SEPARATOR);
    out.push_str(&B64.encode(nonce));
    out
}

/// Parse `"<b64 ciphertext>:<b64 nonce>"`.
///
/// Surrounding whitespace on either half is ignored; Android's default base64
/// encoder terminates each half with a newline.
pub fn parse(text: &str) -> OtpResult<Envelope> {
    let (ct_b64, nonce_b64) = text
        .split_once(SEPARATOR)
        .ok_or_else(|| OtpError::MalformedEnvelope("missing ':' separator".into()))?;

    let ciphertext = B64
        .decode(ct_b64.trim())
        .map_err(|e| OtpError::MalformedEnvelope(format!("ciphertext is not valid base64: {e}")))?;
    let nonce_bytes = B64
        .decode(nonce_b64.trim())
        .map_err(|e| OtpError::MalformedEnvelope(format!("nonce is not valid base64: {e}")))?;

    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
        OtpError::MalformedEnvelope(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce_bytes.len()
        ))
    })?;

    Ok(Envelope { ciphertext, nonce })
}
