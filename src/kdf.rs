//! Password-based key derivation
//!
//! Keys are derived with PBKDF2 using HMAC-SHA1 as the pseudorandom
//! function. The defaults (256-bit key, 100 iterations) are what every
//! existing envelope was produced with; changing them yields envelopes that
//! only decrypt under the same parameters.

use crate::error::{ErrorCategory, ErrorKind, Result, TransitError};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use zeroize::Zeroizing;

/// Default derived key size in bits
pub const DEFAULT_KEY_BITS: u32 = 256;

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 100;

/// Key sizes accepted by AES
const SUPPORTED_KEY_BITS: [u32; 3] = [128, 192, 256];

/// Parameters for key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    key_bits: u32,
    iterations: u32,
}

impl KdfParams {
    /// Create validated parameters.
    ///
    /// `key_bits` must be one of 128, 192 or 256 and `iterations` must be
    /// at least one.
    pub fn new(key_bits: u32, iterations: u32) -> Result<Self> {
        if !SUPPORTED_KEY_BITS.contains(&key_bits) {
            return Err(TransitError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidParams,
                format!("unsupported key size {} bits; expected 128, 192 or 256", key_bits),
            ));
        }
        if iterations == 0 {
            return Err(TransitError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidParams,
                "iteration count must be at least 1",
            ));
        }
        Ok(Self {
            key_bits,
            iterations,
        })
    }

    pub fn key_bits(&self) -> u32 {
        self.key_bits
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derived key length in bytes
    pub fn key_len(&self) -> usize {
        (self.key_bits / 8) as usize
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a key of `params.key_len()` bytes from a password and salt.
///
/// Deterministic for identical inputs. The empty password is an ordinary
/// input. The returned buffer is wiped when dropped.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Zeroizing<Vec<u8>> {
    log::debug!(
        "deriving {}-bit key with {} iterations",
        params.key_bits,
        params.iterations
    );
    let mut key = Zeroizing::new(vec![0u8; params.key_len()]);
    pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, params.iterations, &mut key);
    key
}
