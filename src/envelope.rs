//! Transport-safe envelope codec
//!
//! An envelope is the ASCII string
//!
//! ```text
//! hex(salt) || hex(iv) || base64(ciphertext)
//! ```
//!
//! with every `/` replaced by the escape token `@xZ`, so the result can be
//! embedded in URLs and other media that reserve the slash. There is no
//! version tag and no length prefix: the first 32 characters are the salt,
//! the next 32 the IV and the remainder the ciphertext.
//!
//! Encoding always emits `=` padding. Decoding accepts the ciphertext with or
//! without it.

use crate::error::{ErrorCategory, ErrorKind, Result, TransitError};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of IV in bytes (one AES block)
pub const IV_LEN: usize = 16;

/// Replacement for every `/` in an encoded envelope. `@` is in neither the
/// hex nor the Base64 alphabet.
pub const ESCAPE_TOKEN: &str = "@xZ";

const SALT_HEX_LEN: usize = SALT_LEN * 2;
const IV_HEX_LEN: usize = IV_LEN * 2;
const HEADER_LEN: usize = SALT_HEX_LEN + IV_HEX_LEN;

/// Standard alphabet, padding optional on decode.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The three components carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(salt: [u8; SALT_LEN], iv: [u8; IV_LEN], ciphertext: Vec<u8>) -> Self {
        Self {
            salt,
            iv,
            ciphertext,
        }
    }

    /// Encode to the escaped transit string.
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}{}{}",
            hex::encode(self.salt),
            hex::encode(self.iv),
            STANDARD.encode(&self.ciphertext)
        );
        escape(&raw)
    }

    /// Parse an escaped transit string.
    ///
    /// Slicing is positional. Character sets are only checked by the hex and
    /// Base64 decoders afterwards, so any malformed input surfaces as a
    /// [`TransitError`] rather than a panic.
    pub fn parse(transit: &str) -> Result<Self> {
        let raw = unescape(transit);

        let (salt_hex, iv_hex, body) = match (
            raw.get(..SALT_HEX_LEN),
            raw.get(SALT_HEX_LEN..HEADER_LEN),
            raw.get(HEADER_LEN..),
        ) {
            (Some(salt), Some(iv), Some(body)) => (salt, iv, body),
            _ => {
                return Err(TransitError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::EnvelopeTruncated,
                    format!(
                        "envelope shorter than its {}-character header; likely truncated",
                        HEADER_LEN
                    ),
                ));
            }
        };

        let salt = decode_header(salt_hex, "salt")?;
        let iv = decode_header(iv_hex, "iv")?;
        let ciphertext = LENIENT.decode(body).map_err(|e| {
            TransitError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Base64Decode,
                format!("base64 decoding of ciphertext failed: {}", e),
                e,
            )
        })?;

        Ok(Self {
            salt,
            iv,
            ciphertext,
        })
    }
}

/// Replace every `/` with [`ESCAPE_TOKEN`].
pub fn escape(raw: &str) -> String {
    raw.replace('/', ESCAPE_TOKEN)
}

/// Replace every [`ESCAPE_TOKEN`] with `/`.
pub fn unescape(transit: &str) -> String {
    transit.replace(ESCAPE_TOKEN, "/")
}

fn decode_header<const N: usize>(hex_str: &str, what: &str) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(hex_str, &mut out).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::HexDecode,
            format!("hex decoding of {} failed: {}", what, e),
            e,
        )
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str =
        "4cab2a2db6a3c31b01d804def28276e665a8e27d8879283831b664bd8b7f0ad4GMNeRp5MCAb+jW3THsNnyQ==";

    #[test]
    fn test_parse_known_envelope() {
        let envelope = Envelope::parse(KNOWN).unwrap();
        assert_eq!(hex::encode(envelope.salt), "4cab2a2db6a3c31b01d804def28276e6");
        assert_eq!(hex::encode(envelope.iv), "65a8e27d8879283831b664bd8b7f0ad4");
        assert_eq!(envelope.ciphertext.len(), 16);
        assert_eq!(envelope.encode(), KNOWN);
    }

    #[test]
    fn test_encode_layout() {
        let envelope = Envelope::new([0xABu8; SALT_LEN], [0x01u8; IV_LEN], b"hi".to_vec());
        assert_eq!(
            envelope.encode(),
            "abababababababababababababababab01010101010101010101010101010101aGk="
        );
    }

    #[test]
    fn test_slash_is_escaped() {
        // 0xFF bytes encode to '/' in standard base64
        let envelope = Envelope::new([0u8; SALT_LEN], [0u8; IV_LEN], vec![0xFFu8; 6]);
        let encoded = envelope.encode();

        assert!(!encoded.contains('/'));
        assert!(encoded.ends_with("@xZ@xZ@xZ@xZ@xZ@xZ@xZ@xZ"));
        assert_eq!(Envelope::parse(&encoded).unwrap(), envelope);
    }

    #[test]
    fn test_escape_roundtrip() {
        let raw = "ab/cd//ef+g=";
        let escaped = escape(raw);
        assert_eq!(escaped, "ab@xZcd@xZ@xZef+g=");
        assert_eq!(unescape(&escaped), raw);
    }

    #[test]
    fn test_empty_ciphertext() {
        let envelope = Envelope::new([7u8; SALT_LEN], [9u8; IV_LEN], Vec::new());
        let encoded = envelope.encode();
        assert_eq!(encoded.len(), 64);
        assert_eq!(Envelope::parse(&encoded).unwrap(), envelope);
    }

    #[test]
    fn test_truncated_input() {
        for input in ["", "invalidtransitmessage", &KNOWN[..63]] {
            let err = Envelope::parse(input).expect_err("expected truncated envelope error");
            assert_eq!(err.kind, Some(ErrorKind::EnvelopeTruncated));
        }
    }

    #[test]
    fn test_bad_hex() {
        let input = format!("zz{}", &KNOWN[2..]);
        let err = Envelope::parse(&input).expect_err("expected hex decode error");
        assert_eq!(err.kind, Some(ErrorKind::HexDecode));
    }

    #[test]
    fn test_unpadded_ciphertext_accepted() {
        let unpadded = KNOWN.trim_end_matches('=');
        assert_eq!(Envelope::parse(unpadded).unwrap(), Envelope::parse(KNOWN).unwrap());

        // Re-encoding restores the padding.
        assert_eq!(Envelope::parse(unpadded).unwrap().encode(), KNOWN);
    }

    #[test]
    fn test_bad_base64() {
        let input = format!("{}bad$$", &KNOWN[..64]);
        let err = Envelope::parse(&input).expect_err("expected base64 decode error");
        assert_eq!(err.kind, Some(ErrorKind::Base64Decode));
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        // 31 ASCII characters followed by a multi-byte character straddling
        // the salt boundary.
        let input = format!("{}é{}", "a".repeat(31), "b".repeat(64));
        assert!(Envelope::parse(&input).is_err());
    }
}
