//! Where the CLI gets its password from
//!
//! A [`PasswordSource`] is consumed by [`PasswordSource::read`], so every
//! operation prompts at most once.

use crate::error::{ErrorCategory, ErrorKind, Result, TransitError};
use std::io::{self, Read};
use zeroize::Zeroizing;

const PROMPT: &str = "Password (transitbox): ";

pub enum PasswordSource {
    /// Prompt on the controlling terminal without echo.
    Terminal,
    /// All of stdin, verbatim (a trailing newline is part of the password).
    Stdin,
    /// A password already in memory.
    Fixed(Zeroizing<String>),
}

impl PasswordSource {
    pub fn fixed(password: impl Into<String>) -> Self {
        PasswordSource::Fixed(Zeroizing::new(password.into()))
    }

    pub fn read(self) -> Result<Zeroizing<String>> {
        match self {
            PasswordSource::Terminal => rpassword::prompt_password(PROMPT)
                .map(Zeroizing::new)
                .map_err(|e| {
                    TransitError::with_kind_and_source(
                        ErrorCategory::User,
                        ErrorKind::PasswordUnavailable,
                        format!("cannot prompt for password on the terminal: {}", e),
                        e,
                    )
                }),
            PasswordSource::Stdin => read_utf8(io::stdin().lock()),
            PasswordSource::Fixed(password) => Ok(password),
        }
    }
}

fn read_utf8(mut reader: impl Read) -> Result<Zeroizing<String>> {
    let mut password = Zeroizing::new(String::new());
    reader.read_to_string(&mut password).map_err(|e| {
        if e.kind() == io::ErrorKind::InvalidData {
            TransitError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidUtf8,
                "password is not valid UTF-8",
                e,
            )
        } else {
            TransitError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        }
    })?;
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source() {
        let password = PasswordSource::fixed("mysecretpassword").read().unwrap();
        assert_eq!(password.as_str(), "mysecretpassword");
    }

    #[test]
    fn test_read_keeps_whitespace() {
        let password = read_utf8(" pässwörd\n".as_bytes()).unwrap();
        assert_eq!(password.as_str(), " pässwörd\n");
    }

    #[test]
    fn test_read_empty() {
        assert_eq!(read_utf8(&b""[..]).unwrap().as_str(), "");
    }

    #[test]
    fn test_read_rejects_non_utf8() {
        let err = read_utf8(&[0x70u8, 0xff, 0xfe][..]).expect_err("expected UTF-8 error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidUtf8));
        assert_eq!(err.category, ErrorCategory::User);
    }
}
