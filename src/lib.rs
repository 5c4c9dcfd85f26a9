//! Transitbox - password-based encryption of short text messages into
//! transport-safe envelopes
//!
//! ```
//! let transit = transitbox::encrypt("Hello, World!", "mysecretpassword", true).unwrap();
//! assert_eq!(transitbox::decrypt(&transit, "mysecretpassword"), "Hello, World!");
//! ```

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod kdf;
pub mod message_ops;
pub mod password;
pub mod transitcrypt;

pub use error::{ErrorCategory, ErrorKind, Result, TransitError};
pub use kdf::KdfParams;
pub use transitcrypt::{Mode, TransitCipher, decrypt, encrypt, try_decrypt};
