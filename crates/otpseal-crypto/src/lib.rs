//! otpseal-crypto: numeric one-time passcodes and their AES-256-GCM envelopes
//!
//! Pipeline:
//! ```text
//! generate → "483920" → encrypt(handle) → (ciphertext||tag, nonce) → "b64(ct):b64(nonce)"
//! ```
//!
//! - `handle`: opaque key handle; raw key bytes never leave it
//! - `cipher`: AES-256-GCM with a fresh random 96-bit nonce per message
//! - `envelope`: colon-delimited base64 text form
//! - `otp`: CSPRNG-backed digit generator with injectable randomness

pub mod cipher;
pub mod envelope;
pub mod handle;
pub mod otp;

pub use cipher::{decrypt, encrypt};
pub use envelope::{parse, serialize, Envelope};
pub use handle::{generate_key_material, KeyHandle};
pub use otp::{OsRandom, OtpGenerator, RandomSource, DEFAULT_OTP_LENGTH};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag (128-bit)
pub const TAG_SIZE: usize = 16;
