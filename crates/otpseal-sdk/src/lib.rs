//! otpseal-sdk: one object for OTP generation and at-rest protection
//!
//! ```text
//! encrypt_otp(otp) = serialize(encrypt(get_or_create_key(alias), utf8(otp)))
//! decrypt_otp(txt) = utf8(decrypt(get_or_create_key(alias), parse(txt)))
//! ```
//!
//! Construct one [`OtpSeal`] at startup and share it by reference or `Arc`.

pub mod facade;

pub use facade::{OtpSeal, OtpSealBuilder};
pub use otpseal_core::{OtpError, OtpResult, OtpSealConfig};
pub use otpseal_crypto::{RandomSource, DEFAULT_OTP_LENGTH};
pub use otpseal_secrets::{FileKeyStore, KeyStore, KeychainKeyStore, MemoryKeyStore};
