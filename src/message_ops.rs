//! File-level encryption/decryption operations
//!
//! Reads a UTF-8 message or a transit envelope from a file, runs it through
//! [`TransitCipher`], and writes the result with owner-only permissions.

use crate::error::{ErrorCategory, ErrorKind, Result, TransitError};
use crate::password::PasswordSource;
use crate::transitcrypt::{Mode, TransitCipher};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encrypt the message in `input_path` and write its envelope to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    cipher: &TransitCipher,
    mode: Mode,
    input_path: &Path,
    output_path: &Path,
    password: PasswordSource,
) -> Result<()> {
    let message = read_text(input_path)?;
    let password = password.read()?;
    let transit = cipher
        .encrypt(&message, &password, mode)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, transit.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    Ok(())
}

/// Decrypt the envelope in `input_path` and write the message to `output_path`.
///
/// Whitespace around the envelope (such as a trailing newline) is ignored.
/// Nothing is written if decryption fails.
pub fn decrypt_file(
    cipher: &TransitCipher,
    input_path: &Path,
    output_path: &Path,
    password: PasswordSource,
) -> Result<()> {
    let transit = read_text(input_path)?;
    let password = password.read()?;
    let message = cipher
        .try_decrypt(transit.trim(), &password)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, message.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Replace the envelope at `crypt_path` with an encryption of the message in
/// `plain_path`, under the same password.
///
/// This function:
/// 1. Decrypts the existing envelope to validate the password
/// 2. Reads the new message from `plain_path`
/// 3. Encrypts it with the validated password
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
pub fn update_file(
    cipher: &TransitCipher,
    mode: Mode,
    plain_path: &Path,
    crypt_path: &Path,
    password: PasswordSource,
) -> Result<()> {
    let transit = read_text(crypt_path)?;
    let password = password.read()?;

    // Validate password by decrypting existing envelope (discard message)
    cipher
        .try_decrypt(transit.trim(), &password)
        .map_err(|e| e.with_context("failed to decrypt"))?;

    let crypt_dir = match crypt_path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => {
            return Err(TransitError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "crypt_path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;
    let new_message = read_text(plain_path)?;
    let new_transit = cipher
        .encrypt(&new_message, &password, mode)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    temp_file.write_all(new_transit.as_bytes()).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    // NamedTempFile is already created 0o600 on Unix.
    temp_file.persist(crypt_path).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", crypt_path.display()),
            e,
        )
    })?;
    log::debug!("replaced envelope at {}", crypt_path.display());
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        TransitError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                TransitError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            TransitError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            TransitError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> TransitError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    TransitError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
