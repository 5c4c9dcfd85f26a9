use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The envelope is shorter than its salt and IV header.
    EnvelopeTruncated,
    /// The salt or IV header is not valid hexadecimal.
    HexDecode,
    /// The ciphertext section is not valid Base64.
    Base64Decode,
    /// Padding could not be removed after decryption, which is what a wrong
    /// password or corrupted ciphertext looks like.
    DecryptionFailed,
    /// The recovered plaintext (or a supplied password) is not UTF-8.
    InvalidUtf8,
    /// Key derivation parameters are out of range.
    InvalidParams,
    /// Every encryption attempt produced an envelope that did not decrypt
    /// back to the original message.
    SelfCheckFailed,
    /// The operating system random source failed.
    RandomSource,
    /// The password could not be read from the terminal.
    PasswordUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct TransitError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl TransitError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Renders this error followed by each chained source, separated by `: `.
    pub fn chain_message(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = TransitError::with_kind(
            ErrorCategory::User,
            ErrorKind::EnvelopeTruncated,
            "envelope too short",
        )
        .with_context("failed to decrypt");

        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::EnvelopeTruncated));
        assert_eq!(err.message(), "failed to decrypt");
        assert!(err.source_error().is_some());
    }

    #[test]
    fn test_chain_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = TransitError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read from in.txt",
            io,
        )
        .with_context("encryption failed");

        assert_eq!(
            err.chain_message(),
            "encryption failed: failed to read from in.txt: no such file"
        );
    }

    #[test]
    fn test_new_has_no_kind() {
        let err = TransitError::new(ErrorCategory::Internal, "oops");
        assert_eq!(err.kind, None);
        assert!(err.source_error().is_none());
        assert_eq!(err.to_string(), "oops");
    }
}
