//! Transitbox CLI - password-based message encryption
//!
//! Command-line interface for encrypting and decrypting text files into
//! transport-safe envelopes using PBKDF2 key derivation and AES-CBC.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use transitbox::kdf::{DEFAULT_ITERATIONS, DEFAULT_KEY_BITS, KdfParams};
use transitbox::message_ops;
use transitbox::password::PasswordSource;
use transitbox::transitcrypt::{DEFAULT_MAX_ATTEMPTS, Mode, TransitCipher};

#[derive(Parser)]
#[command(name = "transitbox")]
#[command(version)]
#[command(about = "Password-based encryption of text into transport-safe envelopes.", long_about = None)]
struct Cli {
    /// Read the password from stdin instead of prompting on the terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    /// PBKDF2 iteration count; envelopes only decrypt with the count they were made with
    #[arg(long, global = true, env = "TRANSITBOX_ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Maximum number of encryption attempts before the self-check gives up
    #[arg(long, global = true, env = "TRANSITBOX_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the envelope to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Derive salt and IV from password and message so that equal
        /// inputs produce equal envelopes
        #[arg(long)]
        deterministic: bool,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file holding the envelope
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the decrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing envelope file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Derive salt and IV from password and message
        #[arg(long)]
        deterministic: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = KdfParams::new(DEFAULT_KEY_BITS, cli.iterations).and_then(|kdf| {
        let cipher = TransitCipher::new(kdf, cli.max_attempts);
        let password = if cli.password_stdin {
            PasswordSource::Stdin
        } else {
            PasswordSource::Terminal
        };
        match cli.command {
            Commands::Encrypt {
                input,
                output,
                deterministic,
            } => message_ops::encrypt_file(
                &cipher,
                mode_for(deterministic),
                &input,
                &output,
                password,
            ),
            Commands::Decrypt { input, output } => {
                message_ops::decrypt_file(&cipher, &input, &output, password)
            }
            Commands::Update {
                input,
                output,
                deterministic,
            } => message_ops::update_file(
                &cipher,
                mode_for(deterministic),
                &input,
                &output,
                password,
            ),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }
}

fn mode_for(deterministic: bool) -> Mode {
    Mode::from_random(!deterministic)
}
