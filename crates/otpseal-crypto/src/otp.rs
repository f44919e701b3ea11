//! Numeric one-time passcode generation

use otpseal_core::{OtpError, OtpResult};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroize;

/// Digits produced when the caller does not ask for a length.
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// Largest multiple of 10 that fits in a byte; bytes at or above it are
/// discarded so `byte % 10` stays uniform.
const REJECT_THRESHOLD: u8 = 250;

/// Refill rounds before a source that only yields rejected bytes is treated
/// as broken.
const MAX_REFILL_ROUNDS: usize = 64;

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]) -> OtpResult<()>;
}

/// Operating-system CSPRNG (`getrandom`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> OtpResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| OtpError::CryptoOperation(format!("OS random source failed: {e}")))
    }
}

/// Draws fixed-length decimal codes from a [`RandomSource`].
#[derive(Clone)]
pub struct OtpGenerator {
    source: Arc<dyn RandomSource>,
}

impl OtpGenerator {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    /// Generate `length` independent uniform digits. Leading zeros are kept.
    pub fn generate(&self, length: usize) -> OtpResult<String> {
        if length == 0 {
            return Err(OtpError::InvalidLength(length));
        }

        let mut otp = String::with_capacity(length);
        let mut buf = vec![0u8; length];
        let mut rounds = 0;

        while otp.len() < length {
            if rounds == MAX_REFILL_ROUNDS {
                buf.zeroize();
                otp.zeroize();
                return Err(OtpError::CryptoOperation(
                    "random source produced no usable bytes".into(),
                ));
            }
            rounds += 1;

            let want = length - otp.len();
            self.source.fill_bytes(&mut buf[..want])?;
            for &b in buf[..want].iter().filter(|&&b| b < REJECT_THRESHOLD) {
                otp.push(char::from(b'0' + b % 10));
            }
        }

        buf.zeroize();
        Ok(otp)
    }
}

impl Default for OtpGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

impl std::fmt::Debug for OtpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Replays a fixed byte script, cycling when exhausted.
    struct ScriptedRandom {
        script: Vec<u8>,
        pos: Mutex<usize>,
    }

    impl ScriptedRandom {
        fn new(script: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                script: script.to_vec(),
                pos: Mutex::new(0),
            })
        }
    }

    impl RandomSource for ScriptedRandom {
        fn fill_bytes(&self, dest: &mut [u8]) -> OtpResult<()> {
            let mut pos = self.pos.lock().unwrap();
            for b in dest.iter_mut() {
                *b = self.script[*pos % self.script.len()];
                *pos += 1;
            }
            Ok(())
        }
    }

    struct FailingRandom;

    impl RandomSource for FailingRandom {
        fn fill_bytes(&self, _dest: &mut [u8]) -> OtpResult<()> {
            Err(OtpError::CryptoOperation("entropy pool unavailable".into()))
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let result = OtpGenerator::default().generate(0);
        assert!(matches!(result, Err(OtpError::InvalidLength(0))));
    }

    #[test]
    fn test_default_length() {
        let otp = OtpGenerator::default().generate(DEFAULT_OTP_LENGTH).unwrap();
        assert_eq!(otp.len(), 6);
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let gen = OtpGenerator::new(ScriptedRandom::new(&[0, 10, 20, 1, 2, 3]));
        assert_eq!(gen.generate(6).unwrap(), "000123");
    }

    #[test]
    fn test_biased_bytes_are_rejected() {
        // 250..=255 would skew digits 0-5; they must be skipped, not folded.
        let gen = OtpGenerator::new(ScriptedRandom::new(&[255, 4, 250, 8, 253, 249]));
        assert_eq!(gen.generate(3).unwrap(), "489");
    }

    #[test]
    fn test_source_yielding_only_rejects_fails() {
        let gen = OtpGenerator::new(ScriptedRandom::new(&[251, 252, 255]));
        let result = gen.generate(6);
        assert!(matches!(result, Err(OtpError::CryptoOperation(_))));
    }

    #[test]
    fn test_source_failure_propagates() {
        let gen = OtpGenerator::new(Arc::new(FailingRandom));
        assert!(matches!(gen.generate(6), Err(OtpError::CryptoOperation(_))));
    }

    #[test]
    fn test_successive_codes_rarely_collide() {
        let gen = OtpGenerator::default();
        let samples: Vec<String> = (0..1000).map(|_| gen.generate(6).unwrap()).collect();
        let distinct: HashSet<&String> = samples.iter().collect();

        // ~0.5 expected birthday collisions in a 10^6 space
        assert!(distinct.len() >= 990, "only {} distinct codes", distinct.len());
    }

    #[test]
    fn test_digit_frequency_roughly_uniform() {
        let gen = OtpGenerator::default();
        let mut counts = [0usize; 10];
        for _ in 0..1000 {
            for c in gen.generate(6).unwrap().bytes() {
                counts[usize::from(c - b'0')] += 1;
            }
        }
        // expected 600 each, sd ~23
        for (digit, &n) in counts.iter().enumerate() {
            assert!((450..=750).contains(&n), "digit {digit} seen {n} times");
        }
    }

    proptest! {
        #[test]
        fn generated_code_is_all_digits(len in 1usize..=64) {
            let otp = OtpGenerator::default().generate(len).unwrap();
            prop_assert_eq!(otp.len(), len);
            prop_assert!(otp.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
