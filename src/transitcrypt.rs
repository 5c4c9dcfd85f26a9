//! Encryption/decryption of text messages using PBKDF2 + AES-CBC
//!
//! This module implements password-based encryption using:
//! - PBKDF2-HMAC-SHA1 for key derivation from the password
//! - AES in CBC mode with PKCS#7 padding
//!
//! The output is an [`Envelope`] in its escaped transit form. There is no
//! authentication tag, so a wrong password is only noticed when the padding
//! or the UTF-8 decoding of the recovered plaintext is invalid.
//!
//! Salt and IV are generated in one of two modes:
//! - [`Mode::Random`]: 16 fresh bytes each from the OS random source.
//! - [`Mode::Deterministic`]: salt = MD5(password), IV = MD5(message). The
//!   envelope is then a pure function of (message, password), which also
//!   reveals when two messages under the same password are equal.

use crate::envelope::{Envelope, IV_LEN, SALT_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, TransitError};
use crate::kdf::{self, KdfParams};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;

/// Default number of encryption attempts before giving up on the self-check
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How salt and IV are chosen for a new envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Fresh random salt and IV on every call
    #[default]
    Random,
    /// Salt and IV are hashes of the password and the message
    Deterministic,
}

impl Mode {
    /// Maps a `random` flag onto a mode.
    pub fn from_random(random: bool) -> Self {
        if random {
            Mode::Random
        } else {
            Mode::Deterministic
        }
    }
}

/// Encryptor and decryptor sharing one set of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitCipher {
    kdf: KdfParams,
    max_attempts: u32,
}

impl Default for TransitCipher {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl TransitCipher {
    pub fn new(kdf: KdfParams, max_attempts: u32) -> Self {
        Self { kdf, max_attempts }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Sets the attempt cap for [`TransitCipher::encrypt`]. Zero behaves as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Encrypt `message` under `password`, returning the transit envelope.
    ///
    /// Every envelope is decrypted again before it is returned. If it does
    /// not reproduce `message` the whole encryption is repeated, up to
    /// [`TransitCipher::max_attempts`] times, after which an error of kind
    /// [`ErrorKind::SelfCheckFailed`] is returned.
    pub fn encrypt(&self, message: &str, password: &str, mode: Mode) -> Result<String> {
        log::debug!("encrypting {} bytes in {:?} mode", message.len(), mode);
        retry_verified(
            self.max_attempts,
            || self.seal(message, password, mode),
            |transit| self.try_decrypt(transit, password),
            message,
        )
    }

    /// Decrypt a transit envelope, returning an empty string on any failure.
    pub fn decrypt(&self, transit: &str, password: &str) -> String {
        self.try_decrypt(transit, password).unwrap_or_else(|e| {
            log::debug!("decryption failed: {}", e);
            String::new()
        })
    }

    /// Decrypt a transit envelope, reporting why it failed.
    pub fn try_decrypt(&self, transit: &str, password: &str) -> Result<String> {
        let envelope = Envelope::parse(transit)?;
        let key = kdf::derive_key(password, &envelope.salt, &self.kdf);
        let plaintext = cbc_decrypt(&key, &envelope.iv, &envelope.ciphertext)?;
        String::from_utf8(plaintext).map_err(|e| {
            TransitError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidUtf8,
                "decrypted plaintext is not valid UTF-8; likely a bad password",
                e,
            )
        })
    }

    /// One unverified encryption pass.
    fn seal(&self, message: &str, password: &str, mode: Mode) -> Result<String> {
        let (salt, iv) = match mode {
            Mode::Random => (random_bytes::<SALT_LEN>()?, random_bytes::<IV_LEN>()?),
            Mode::Deterministic => (md5_of(password.as_bytes()), md5_of(message.as_bytes())),
        };

        let key = kdf::derive_key(password, &salt, &self.kdf);
        let ciphertext = cbc_encrypt(&key, &iv, message.as_bytes())?;

        Ok(Envelope::new(salt, iv, ciphertext).encode())
    }
}

/// Encrypt with default parameters. `random == false` selects deterministic mode.
pub fn encrypt(message: &str, password: &str, random: bool) -> Result<String> {
    TransitCipher::default().encrypt(message, password, Mode::from_random(random))
}

/// Decrypt with default parameters, returning an empty string on any failure.
pub fn decrypt(transit: &str, password: &str) -> String {
    TransitCipher::default().decrypt(transit, password)
}

/// Decrypt with default parameters, reporting why it failed.
pub fn try_decrypt(transit: &str, password: &str) -> Result<String> {
    TransitCipher::default().try_decrypt(transit, password)
}

/// Runs `produce` until `verify` recovers `expected` from its output, at
/// most `max_attempts` times. Errors from `produce` are returned as is.
fn retry_verified<P, V>(
    max_attempts: u32,
    mut produce: P,
    verify: V,
    expected: &str,
) -> Result<String>
where
    P: FnMut() -> Result<String>,
    V: Fn(&str) -> Result<String>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let transit = produce()?;
        match verify(&transit) {
            Ok(recovered) if recovered == expected => return Ok(transit),
            Ok(_) => log::warn!(
                "self-check attempt {}/{}: envelope decrypted to a different message",
                attempt,
                attempts
            ),
            Err(e) => log::warn!(
                "self-check attempt {}/{}: envelope failed to decrypt: {}",
                attempt,
                attempts,
                e
            ),
        }
    }

    Err(TransitError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::SelfCheckFailed,
        format!(
            "encrypted envelope failed to decrypt to the original message after {} attempts",
            attempts
        ),
    ))
}

fn md5_of(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Md5::digest(data));
    out
}

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    OsRng.try_fill_bytes(&mut out).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::RandomSource,
            format!("failed to read from the OS random source: {}", e),
            e,
        )
    })?;
    Ok(out)
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => cbc_encrypt_with::<Aes128>(key, iv, plaintext),
        24 => cbc_encrypt_with::<Aes192>(key, iv, plaintext),
        32 => cbc_encrypt_with::<Aes256>(key, iv, plaintext),
        n => Err(key_length_error(n)),
    }
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => cbc_decrypt_with::<Aes128>(key, iv, ciphertext),
        24 => cbc_decrypt_with::<Aes192>(key, iv, ciphertext),
        32 => cbc_decrypt_with::<Aes256>(key, iv, ciphertext),
        n => Err(key_length_error(n)),
    }
}

fn cbc_encrypt_with<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
    cbc::Encryptor<C>: KeyIvInit + BlockEncryptMut,
{
    let cipher = cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|_| {
        TransitError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidParams,
            "invalid key or iv length for cipher",
        )
    })?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt_with<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
{
    let cipher = cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| {
        TransitError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidParams,
            "invalid key or iv length for cipher",
        )
    })?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            TransitError::with_kind(
                ErrorCategory::User,
                ErrorKind::DecryptionFailed,
                "corrupt input or bad password",
            )
        })
}

fn key_length_error(len: usize) -> TransitError {
    TransitError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::InvalidParams,
        format!("derived key has unsupported length {} bytes", len),
    )
}
